//! SQLite database operations
//!
//! All durable state goes through this module:
//! - Signing keys (one per upstream account)
//! - Hub subscription leases

use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite, SqlitePool};
use std::future::Future;
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Lease row as stored
#[derive(Debug, sqlx::FromRow)]
struct LeaseRow {
    key: String,
    secret: String,
    lease_end: i64,
}

impl LeaseRow {
    fn into_record(self) -> Option<LeaseRecord> {
        let Some((topic, callback)) = split_lease_key(&self.key) else {
            tracing::warn!(key = %self.key, "Skipping lease with malformed key");
            return None;
        };
        let Some(lease_end) = DateTime::from_timestamp(self.lease_end, 0) else {
            tracing::warn!(key = %self.key, lease_end = self.lease_end, "Skipping lease with invalid expiry");
            return None;
        };

        Some(LeaseRecord {
            topic,
            callback,
            secret: self.secret,
            lease_end,
        })
    }
}

fn account_db_id(account_id: u64) -> Result<i64, AppError> {
    i64::try_from(account_id).map_err(|_| {
        AppError::Internal(anyhow::anyhow!("account id {} out of range", account_id))
    })
}

/// Database connection pool wrapper
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Signing keys
    // =========================================================================

    /// Get the stored signing key of an account
    pub async fn get_signing_key(&self, account_id: u64) -> Result<Option<Vec<u8>>, AppError> {
        let key = sqlx::query_scalar::<_, Vec<u8>>(
            "SELECT private_key_der FROM signing_keys WHERE account_id = ?",
        )
        .bind(account_db_id(account_id)?)
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    /// Get the signing key of an account, generating it on first access
    ///
    /// Lookup, generation and insert run inside one transaction. The insert
    /// never overwrites an existing row and the stored row is read back, so
    /// concurrent first accesses always agree on a single key.
    ///
    /// # Arguments
    /// * `account_id` - Upstream account id
    /// * `generate` - Produces a fresh PKCS#1 DER private key
    pub async fn get_or_create_signing_key<F, Fut>(
        &self,
        account_id: u64,
        generate: F,
    ) -> Result<StoredKey, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, AppError>>,
    {
        let id = account_db_id(account_id)?;
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_scalar::<_, Vec<u8>>(
            "SELECT private_key_der FROM signing_keys WHERE account_id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(private_key_der) = existing {
            tx.commit().await?;
            return Ok(StoredKey {
                private_key_der,
                created: false,
            });
        }

        let generated = generate().await?;

        sqlx::query(
            "INSERT INTO signing_keys (account_id, private_key_der, created_at) VALUES (?, ?, ?) ON CONFLICT(account_id) DO NOTHING",
        )
        .bind(id)
        .bind(&generated)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let stored = sqlx::query_scalar::<_, Vec<u8>>(
            "SELECT private_key_der FROM signing_keys WHERE account_id = ?",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let created = stored == generated;
        Ok(StoredKey {
            private_key_der: stored,
            created,
        })
    }

    // =========================================================================
    // Subscription leases
    // =========================================================================

    /// Insert or replace a lease
    pub async fn upsert_lease(&self, lease: &LeaseRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (key, secret, lease_end, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                secret = excluded.secret,
                lease_end = excluded.lease_end,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(lease.key())
        .bind(&lease.secret)
        .bind(lease.lease_end.timestamp())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete a lease
    ///
    /// # Returns
    /// `true` if a lease was removed
    pub async fn delete_lease(&self, topic: &str, callback: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE key = ?")
            .bind(lease_key(topic, callback))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Get a single lease, expired or not
    pub async fn get_lease(
        &self,
        topic: &str,
        callback: &str,
    ) -> Result<Option<LeaseRecord>, AppError> {
        let row = sqlx::query_as::<_, LeaseRow>(
            "SELECT key, secret, lease_end FROM subscriptions WHERE key = ?",
        )
        .bind(lease_key(topic, callback))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(LeaseRow::into_record))
    }

    /// All stored leases, ordered by key
    pub async fn list_leases(&self) -> Result<Vec<LeaseRecord>, AppError> {
        let rows = sqlx::query_as::<_, LeaseRow>(
            "SELECT key, secret, lease_end FROM subscriptions ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().filter_map(LeaseRow::into_record).collect())
    }

    /// Leases still valid at `now`
    pub async fn active_leases(&self, now: DateTime<Utc>) -> Result<Vec<LeaseRecord>, AppError> {
        let rows = sqlx::query_as::<_, LeaseRow>(
            "SELECT key, secret, lease_end FROM subscriptions WHERE lease_end > ? ORDER BY key",
        )
        .bind(now.timestamp())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().filter_map(LeaseRow::into_record).collect())
    }

    /// Delete every lease expired at `now`
    ///
    /// # Returns
    /// Number of deleted leases
    pub async fn delete_expired_leases(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE lease_end <= ?")
            .bind(now.timestamp())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
