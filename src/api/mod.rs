//! API layer
//!
//! HTTP handlers for:
//! - WebFinger discovery
//! - Atom topic feeds
//! - Metrics (Prometheus)

mod feed;
pub mod metrics;
mod wellknown;

pub use feed::topic_feed;
pub use metrics::metrics_router;
pub use wellknown::wellknown_router;
