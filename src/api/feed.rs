//! Atom feed endpoints
//!
//! Topic paths (`/@alice.atom`, `/@alice/status/42.atom`) cannot be
//! expressed as router patterns, so they are served from the fallback.

use axum::{
    extract::State,
    http::{Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};

use crate::AppState;
use crate::error::AppError;
use crate::feed::{ATOM_CONTENT_TYPE, to_atom};
use crate::service::FeedProvider;

/// Fallback handler serving topic feeds
///
/// Any path that does not look like a topic is a plain 404.
pub async fn topic_feed(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
) -> Result<Response, AppError> {
    let path = uri.path();
    if !path.starts_with("/@") || !path.ends_with(".atom") {
        return Err(AppError::NotFound);
    }
    if method != Method::GET && method != Method::HEAD {
        return Ok(StatusCode::METHOD_NOT_ALLOWED.into_response());
    }

    let feed = state.backend.feed(path).await?;
    tracing::debug!(path, entries = feed.entries.len(), "Serving topic feed");

    Ok(([(header::CONTENT_TYPE, ATOM_CONTENT_TYPE)], to_atom(&feed)).into_response())
}
