//! featherlink binary entry point

use async_trait::async_trait;
use featherlink::data::LeaseRecord;
use featherlink::error::AppError;
use featherlink::federation::LeaseRegistrar;
use featherlink::{AppState, config};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Time between two sweeps of expired hub leases
const LEASE_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Records restored leases until the external hub picks them up
struct LoggingRegistrar;

#[async_trait]
impl LeaseRegistrar for LoggingRegistrar {
    async fn register(&self, lease: &LeaseRecord) -> Result<(), AppError> {
        tracing::info!(
            topic = %lease.topic,
            callback = %lease.callback,
            lease_end = %lease.lease_end,
            "Restored subscription lease"
        );
        Ok(())
    }
}

/// Application entry point
///
/// # Setup
/// 1. Initialize tracing/logging
/// 2. Load configuration from file and environment
/// 3. Initialize AppState
/// 4. Restore hub leases and schedule the expired lease purge
/// 5. Start HTTP server
/// 6. Stop background tasks on shutdown
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing/logging
    let log_format =
        std::env::var("FEATHERLINK__LOGGING__FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "featherlink=info,tower_http=debug".into())
    };

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(filter())
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter())
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting featherlink...");
    featherlink::metrics::init_metrics();

    // 2. Load configuration
    let config = config::AppConfig::load()?;
    tracing::info!(
        domain = %config.server.domain,
        protocol = %config.server.protocol,
        poll_interval_secs = config.polling.interval_seconds,
        "Configuration loaded"
    );

    // 3. Initialize application state
    let state = AppState::new(config.clone()).await?;

    // 4. Restore hub leases
    state.leases.restore(&LoggingRegistrar).await?;
    let purge_task = state.leases.spawn_purge_task(LEASE_PURGE_INTERVAL);

    // 5. Start HTTP server
    let app = featherlink::build_router(state.clone());
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Public URL: {}", config.server.base_url());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 6. Stop background tasks
    purge_task.abort();
    state.backend.shutdown().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
