//! Signing key cache
//!
//! One RSA key per upstream account, generated on first use and persisted
//! so every later lookup returns the same key.

use base64::{Engine, engine::general_purpose::URL_SAFE};
use rsa::RsaPrivateKey;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::traits::PublicKeyParts;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::data::Database;
use crate::error::AppError;

/// Signing key cache
///
/// Lookups hit memory first, then the database. Generation is serialized
/// by `generate_lock` in-process and by the database transaction across
/// processes.
pub struct KeyCache {
    db: Arc<Database>,
    /// Cache storage: account_id -> key
    cache: RwLock<HashMap<u64, RsaPrivateKey>>,
    generate_lock: Mutex<()>,
    /// RSA modulus size for new keys
    bits: usize,
}

impl KeyCache {
    /// # Arguments
    /// * `db` - Durable key store
    /// * `bits` - Modulus size of generated keys
    pub fn new(db: Arc<Database>, bits: usize) -> Self {
        Self {
            db,
            cache: RwLock::new(HashMap::new()),
            generate_lock: Mutex::new(()),
            bits,
        }
    }

    /// Get the signing key of an account, generating it if absent
    ///
    /// # Errors
    /// `AppError::Key` if generation or DER decoding fails,
    /// `AppError::Database` if the key store is unavailable
    pub async fn get_or_create(&self, account_id: u64) -> Result<RsaPrivateKey, AppError> {
        if let Some(key) = self.cache.read().await.get(&account_id) {
            tracing::debug!(account_id, "Signing key cache hit");
            return Ok(key.clone());
        }

        let _guard = self.generate_lock.lock().await;

        // Another caller may have filled the cache while we waited
        if let Some(key) = self.cache.read().await.get(&account_id) {
            return Ok(key.clone());
        }

        let bits = self.bits;
        let stored = self
            .db
            .get_or_create_signing_key(account_id, || generate_der(bits))
            .await?;

        if stored.created {
            crate::metrics::KEYS_GENERATED_TOTAL.inc();
            tracing::info!(account_id, bits, "Generated signing key");
        }

        let key = RsaPrivateKey::from_pkcs1_der(&stored.private_key_der)?;
        self.cache.write().await.insert(account_id, key.clone());

        Ok(key)
    }

    /// Drop a cached key, forcing the next lookup to read the database
    pub async fn invalidate(&self, account_id: u64) {
        self.cache.write().await.remove(&account_id);
        tracing::debug!(account_id, "Invalidated signing key cache");
    }
}

/// Generate a PKCS#1 DER encoded RSA private key off the async runtime
async fn generate_der(bits: usize) -> Result<Vec<u8>, AppError> {
    tokio::task::spawn_blocking(move || -> Result<Vec<u8>, AppError> {
        let mut rng = rand::thread_rng();
        let key = RsaPrivateKey::new(&mut rng, bits)?;
        let der = key.to_pkcs1_der()?;
        Ok(der.as_bytes().to_vec())
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("key generation task failed: {}", e)))?
}

/// Magic public key data URL of a signing key
///
/// `data:application/magic-public-key,RSA.<modulus>.<exponent>`, both parts
/// big-endian and URL-safe base64 encoded.
pub fn public_key_data_url(key: &RsaPrivateKey) -> String {
    format!(
        "data:application/magic-public-key,RSA.{}.{}",
        URL_SAFE.encode(key.n().to_bytes_be()),
        URL_SAFE.encode(key.e().to_bytes_be())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_cache() -> (KeyCache, Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(Database::connect(&temp_dir.path().join("keys.db")).await.unwrap());
        (KeyCache::new(db.clone(), 1024), db, temp_dir)
    }

    #[tokio::test]
    async fn test_key_is_stable() {
        let (cache, db, _temp_dir) = create_cache().await;

        let first = cache.get_or_create(42).await.unwrap();
        let second = cache.get_or_create(42).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.size() * 8, 1024);

        // Survives a cold cache
        cache.invalidate(42).await;
        let reloaded = cache.get_or_create(42).await.unwrap();
        assert_eq!(first, reloaded);

        let stored = db.get_signing_key(42).await.unwrap().unwrap();
        assert_eq!(stored, first.to_pkcs1_der().unwrap().as_bytes());
    }

    #[tokio::test]
    async fn test_concurrent_first_access_agrees() {
        let (cache, _db, _temp_dir) = create_cache().await;
        let cache = Arc::new(cache);

        let a = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get_or_create(7).await.unwrap() }
        });
        let b = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get_or_create(7).await.unwrap() }
        });

        assert_eq!(a.await.unwrap(), b.await.unwrap());
    }

    #[tokio::test]
    async fn test_accounts_get_distinct_keys() {
        let (cache, _db, _temp_dir) = create_cache().await;
        let a = cache.get_or_create(1).await.unwrap();
        let b = cache.get_or_create(2).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_public_key_data_url() {
        let (cache, _db, _temp_dir) = create_cache().await;
        let key = cache.get_or_create(1).await.unwrap();

        let url = public_key_data_url(&key);
        let rest = url
            .strip_prefix("data:application/magic-public-key,RSA.")
            .unwrap();
        let (n, e) = rest.split_once('.').unwrap();
        assert_eq!(URL_SAFE.decode(n).unwrap(), key.n().to_bytes_be());
        // 65537
        assert_eq!(e, "AQAB");
    }
}
