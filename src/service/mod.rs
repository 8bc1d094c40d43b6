//! Service layer
//!
//! Ties the upstream client, feed synthesis, polling subscriptions and
//! signing keys together behind the capabilities the protocol layer uses.

mod backend;

pub use backend::{Backend, FeedProvider, Notifier, ResourceProvider, Subscriber};
