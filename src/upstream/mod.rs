//! Upstream timeline service
//!
//! The bridge only reads from the upstream service:
//! - Account profiles
//! - Single posts
//! - Account timelines since a given post

mod client;
mod models;

use async_trait::async_trait;

pub use client::HttpTimelineClient;
pub use models::{
    Entities, HashtagEntity, MediaEntity, MentionEntity, Post, Profile, StatusRef, UrlEntity,
};

use crate::error::AppError;

/// Timeline query parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineQuery {
    /// Numeric account id
    pub account_id: u64,
    /// Only return posts newer than this id
    pub since_id: Option<u64>,
    /// Maximum number of posts
    pub count: u32,
    /// Include shares of other accounts' posts
    pub include_shares: bool,
}

/// Read access to the upstream timeline service
///
/// Implementations own authentication, transport and retry policy.
/// Absent accounts or posts map to `AppError::NotFound`, transient
/// failures to `AppError::Upstream`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TimelineClient: Send + Sync {
    /// Fetch an account profile by handle
    async fn get_profile(&self, handle: &str) -> Result<Profile, AppError>;

    /// Fetch a single post by id
    async fn get_post(&self, id: u64) -> Result<Post, AppError>;

    /// Fetch an account timeline, newest first
    async fn get_timeline(&self, query: TimelineQuery) -> Result<Vec<Post>, AppError>;
}
