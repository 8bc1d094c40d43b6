//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub upstream: UpstreamConfig,
    pub polling: PollingConfig,
    pub feed: FeedConfig,
    pub keys: KeyConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 4004)
    pub port: u16,
    /// Public domain (e.g., "bridge.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the bridge
    ///
    /// # Returns
    /// Full URL like "https://bridge.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Upstream timeline service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// REST API root (e.g., "https://api.twitter.com/1.1")
    pub api_base_url: String,
    /// App-only bearer token
    pub bearer_token: String,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

/// Subscription polling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Seconds between two polls of the same topic (default: 900)
    pub interval_seconds: u64,
    /// Maximum posts fetched per poll (default: 200)
    pub page_size: u32,
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

/// On-demand feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Posts per profile feed (default: 20)
    pub page_size: u32,
}

/// Signing key configuration
#[derive(Debug, Clone, Deserialize)]
pub struct KeyConfig {
    /// RSA modulus size in bits (default: 2048)
    pub bits: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (FEATHERLINK__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 4004)?
            .set_default("server.domain", "localhost:4004")?
            .set_default("server.protocol", "http")?
            .set_default("database.path", "./featherlink.db")?
            .set_default("upstream.api_base_url", "https://api.twitter.com/1.1")?
            .set_default("upstream.bearer_token", "")?
            .set_default("upstream.timeout_seconds", 30)?
            .set_default("polling.interval_seconds", 900)?
            .set_default("polling.page_size", 200)?
            .set_default("feed.page_size", 20)?
            .set_default("keys.bits", 2048)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("FEATHERLINK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_KEY_BITS: usize = 1024;

        if self.server.domain.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "server.domain must not be empty".to_string(),
            ));
        }

        if self.polling.interval_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "polling.interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.polling.page_size == 0 || self.feed.page_size == 0 {
            return Err(crate::error::AppError::Config(
                "polling.page_size and feed.page_size must be greater than 0".to_string(),
            ));
        }

        if self.keys.bits < MIN_KEY_BITS {
            return Err(crate::error::AppError::Config(format!(
                "keys.bits must be at least {}",
                MIN_KEY_BITS
            )));
        }

        if self.upstream.bearer_token.is_empty() {
            tracing::warn!("upstream.bearer_token is empty; upstream requests will be rejected");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 4004,
                domain: "bridge.example.com".to_string(),
                protocol: "https".to_string(),
            },
            database: DatabaseConfig {
                path: PathBuf::from("/tmp/featherlink-test.db"),
            },
            upstream: UpstreamConfig {
                api_base_url: "https://api.twitter.com/1.1".to_string(),
                bearer_token: "token".to_string(),
                timeout_seconds: 30,
            },
            polling: PollingConfig {
                interval_seconds: 900,
                page_size: 200,
            },
            feed: FeedConfig { page_size: 20 },
            keys: KeyConfig { bits: 2048 },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_defaults() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.base_url(), "https://bridge.example.com");
        assert_eq!(config.polling.interval(), Duration::from_secs(900));
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = valid_config();
        config.polling.interval_seconds = 0;

        let error = config
            .validate()
            .expect_err("zero polling interval must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("polling.interval_seconds")
        ));
    }

    #[test]
    fn validate_rejects_small_keys() {
        let mut config = valid_config();
        config.keys.bits = 512;

        let error = config.validate().expect_err("512-bit keys must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message) if message.contains("keys.bits")
        ));
    }
}
