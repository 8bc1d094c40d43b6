//! OStatus federation module
//!
//! Handles:
//! - Polling subscriptions (feed deltas for the hub)
//! - Hub lease persistence
//! - Per-account signing keys
//! - WebFinger resource documents

mod key_cache;
mod lease;
mod subscription;
mod webfinger;

pub use key_cache::{KeyCache, public_key_data_url};
pub use lease::{LeaseObserver, LeaseRegistrar, LeaseStore};
pub use subscription::SubscriptionManager;
pub use webfinger::{
    REL_LRDD, REL_MAGIC_PUBLIC_KEY, REL_PROFILE_PAGE, REL_SALMON, REL_UPDATES_FROM,
    WebFingerLink, WebFingerResponse, host_meta_xml, resource_document,
};
