//! Hub subscription lease persistence
//!
//! The hub keeps its subscriber list in memory. Leases are mirrored to the
//! database on every change and handed back to the hub at startup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::data::{Database, LeaseRecord};
use crate::error::AppError;

/// Receives leases restored at startup
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LeaseRegistrar: Send + Sync {
    async fn register(&self, lease: &LeaseRecord) -> Result<(), AppError>;
}

/// Notified by the hub whenever a lease changes
///
/// `None` for `lease_end` means the subscription ended.
#[async_trait]
pub trait LeaseObserver: Send + Sync {
    async fn lease_changed(
        &self,
        topic: &str,
        callback: &str,
        secret: &str,
        lease_end: Option<DateTime<Utc>>,
    );
}

/// Durable lease store
#[derive(Clone)]
pub struct LeaseStore {
    db: Arc<Database>,
}

impl LeaseStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Re-register every valid lease and drop the expired ones
    ///
    /// # Returns
    /// Number of leases handed to the registrar
    ///
    /// # Errors
    /// Database errors and registrar errors abort the restore
    pub async fn restore(&self, registrar: &dyn LeaseRegistrar) -> Result<usize, AppError> {
        let now = Utc::now();
        let mut restored = 0;

        for lease in self.db.list_leases().await? {
            if lease.is_expired_at(now) {
                self.db.delete_lease(&lease.topic, &lease.callback).await?;
                tracing::debug!(topic = %lease.topic, callback = %lease.callback, "Dropped expired lease");
                continue;
            }

            registrar.register(&lease).await?;
            restored += 1;
        }

        tracing::info!(restored, "Restored subscription leases");
        Ok(restored)
    }

    /// Leases valid right now
    pub async fn active_leases(&self) -> Result<Vec<LeaseRecord>, AppError> {
        self.db.active_leases(Utc::now()).await
    }

    /// Delete every expired lease
    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        let purged = self.db.delete_expired_leases(Utc::now()).await?;
        if purged > 0 {
            tracing::info!(purged, "Purged expired subscription leases");
        }
        Ok(purged)
    }

    /// Purge expired leases every `period`, starting one period from now
    pub fn spawn_purge_task(&self, period: Duration) -> JoinHandle<()> {
        let store = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately.
            interval.tick().await;

            loop {
                interval.tick().await;
                if let Err(e) = store.purge_expired().await {
                    tracing::error!(error = %e, "Lease purge failed");
                }
            }
        });

        tracing::info!(period_secs = period.as_secs(), "Lease purge task spawned");
        handle
    }

    async fn apply(
        &self,
        topic: &str,
        callback: &str,
        secret: &str,
        lease_end: Option<DateTime<Utc>>,
    ) -> Result<&'static str, AppError> {
        match lease_end {
            Some(lease_end) => {
                self.db
                    .upsert_lease(&LeaseRecord {
                        topic: topic.to_string(),
                        callback: callback.to_string(),
                        secret: secret.to_string(),
                        lease_end,
                    })
                    .await?;
                Ok("upsert")
            }
            None => {
                self.db.delete_lease(topic, callback).await?;
                Ok("delete")
            }
        }
    }
}

#[async_trait]
impl LeaseObserver for LeaseStore {
    async fn lease_changed(
        &self,
        topic: &str,
        callback: &str,
        secret: &str,
        lease_end: Option<DateTime<Utc>>,
    ) {
        match self.apply(topic, callback, secret, lease_end).await {
            Ok(kind) => {
                crate::metrics::LEASE_CHANGES_TOTAL
                    .with_label_values(&[kind])
                    .inc();
                tracing::debug!(topic, callback, kind, "Persisted lease change");
            }
            Err(e) => {
                tracing::error!(topic, callback, error = %e, "Cannot save subscription lease");
            }
        }
    }
}
