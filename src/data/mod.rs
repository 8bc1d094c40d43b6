//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite database operations
//! - Durable record models

mod database;
mod models;

pub use database::Database;
pub use models::*;
