//! Error types for featherlink
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
///
/// Feed, subscription and key operations all report failures through
/// this enum. None of the variants is fatal for a running process.
#[derive(Debug, Error)]
pub enum AppError {
    /// Topic URI could not be parsed (400)
    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    /// Account or post absent upstream (404)
    #[error("Resource not found")]
    NotFound,

    /// Transient upstream timeline failure (502)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Inbound activity with an unhandled object type or verb (422)
    #[error("Unsupported activity: {0}")]
    UnsupportedActivity(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Signing key generation or encoding error (500)
    #[error("Key error: {0}")]
    Key(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<rsa::Error> for AppError {
    fn from(err: rsa::Error) -> Self {
        AppError::Key(err.to_string())
    }
}

impl From<rsa::pkcs1::Error> for AppError {
    fn from(err: rsa::pkcs1::Error) -> Self {
        AppError::Key(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message, error_type) = match &self {
            AppError::InvalidTopic(_) => {
                (StatusCode::BAD_REQUEST, self.to_string(), "invalid_topic")
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string(), "not_found"),
            AppError::Upstream(_) => (StatusCode::BAD_GATEWAY, self.to_string(), "upstream"),
            AppError::UnsupportedActivity(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                self.to_string(),
                "unsupported_activity",
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
                "database",
            ),
            AppError::Key(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Key error".to_string(),
                "key",
            ),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), "config"),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "internal",
            ),
        };

        crate::metrics::ERRORS_TOTAL
            .with_label_values(&[error_type])
            .inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
