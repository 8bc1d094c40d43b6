//! Data models
//!
//! Rust structs representing durable records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Subscription lease
// =============================================================================

/// Separator between topic and callback in lease keys
///
/// Topic and callback are URLs, which never contain a raw space.
const LEASE_KEY_SEPARATOR: char = ' ';

/// A hub subscription lease
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseRecord {
    /// Topic URL
    pub topic: String,
    /// Subscriber callback URL
    pub callback: String,
    /// Secret used to sign content delivered to the callback
    pub secret: String,
    /// Lease expiry
    pub lease_end: DateTime<Utc>,
}

impl LeaseRecord {
    pub fn key(&self) -> String {
        lease_key(&self.topic, &self.callback)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.lease_end <= now
    }
}

/// Combine topic and callback into one storage key
pub fn lease_key(topic: &str, callback: &str) -> String {
    format!("{}{}{}", topic, LEASE_KEY_SEPARATOR, callback)
}

/// Split a storage key back into (topic, callback)
pub fn split_lease_key(key: &str) -> Option<(String, String)> {
    let (topic, callback) = key.split_once(LEASE_KEY_SEPARATOR)?;
    Some((topic.to_string(), callback.to_string()))
}

// =============================================================================
// Signing key
// =============================================================================

/// Outcome of a signing key lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredKey {
    /// PKCS#1 DER encoded private key
    pub private_key_der: Vec<u8>,
    /// Whether this lookup generated and stored the key
    pub created: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_key_round_trip() {
        let key = lease_key(
            "https://bridge.example.com/@alice.atom",
            "https://social.example.org/push/1?token=a%20b",
        );
        assert_eq!(
            split_lease_key(&key),
            Some((
                "https://bridge.example.com/@alice.atom".to_string(),
                "https://social.example.org/push/1?token=a%20b".to_string()
            ))
        );
        assert_eq!(split_lease_key("no-separator"), None);
    }
}
