//! featherlink - An OStatus bridge for a microblogging timeline
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - WebFinger / host-meta                                    │
//! │  - Atom topic feeds                                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Backend (subscriber, notifier, feed, resource)           │
//! │  - Polling subscriptions, leases, signing keys              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌──────────────────────────────┐ ┌────────────────────────────┐
//! │  Upstream timeline API       │ │  Data Layer (SQLite/sqlx)  │
//! └──────────────────────────────┘ └────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `service`: Backend capabilities consumed by the protocol layer
//! - `federation`: Subscriptions, leases, keys, WebFinger
//! - `feed`: Topics, entry rendering, feed synthesis, Atom
//! - `upstream`: Timeline API client
//! - `data`: Database layer
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod federation;
pub mod feed;
pub mod metrics;
pub mod service;
pub mod upstream;

use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Bridge backend
    pub backend: Arc<service::Backend>,

    /// Hub lease persistence
    pub leases: federation::LeaseStore,
}

impl AppState {
    /// Initialize application state against the configured upstream API
    ///
    /// # Errors
    /// Returns error if the database or HTTP client cannot be set up
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let client = upstream::HttpTimelineClient::new(&config.upstream)?;
        Self::with_client(config, Arc::new(client)).await
    }

    /// Initialize application state with a given upstream client
    ///
    /// # Steps
    /// 1. Connect to SQLite database
    /// 2. Build feed synthesizer and subscription manager
    /// 3. Build signing key cache and lease store
    pub async fn with_client(
        config: config::AppConfig,
        client: Arc<dyn upstream::TimelineClient>,
    ) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = Arc::new(data::Database::connect(&config.database.path).await?);

        // 2. Feeds and subscriptions
        let urls = feed::BridgeUrls::new(config.server.base_url(), config.server.domain.clone());
        let synthesizer =
            feed::FeedSynthesizer::new(client, feed::EntryRenderer::new(urls), config.feed.page_size);
        let subscriptions = federation::SubscriptionManager::new(
            synthesizer.clone(),
            config.polling.interval(),
            config.polling.page_size,
        );

        // 3. Keys and leases
        let keys = Arc::new(federation::KeyCache::new(db.clone(), config.keys.bits));
        let leases = federation::LeaseStore::new(db.clone());

        let backend = service::Backend::new(synthesizer, subscriptions, keys);

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db,
            backend: Arc::new(backend),
            leases,
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::wellknown_router())
        .fallback(api::topic_feed)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
