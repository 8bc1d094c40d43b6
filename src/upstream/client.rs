//! REST API v1.1 client
//!
//! Uses app-only bearer authentication. Retries are left to callers:
//! the polling loop simply tries again on its next tick.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::{Post, Profile, TimelineClient, TimelineQuery};
use crate::config::UpstreamConfig;
use crate::error::AppError;

/// HTTP implementation of [`TimelineClient`]
#[derive(Clone)]
pub struct HttpTimelineClient {
    http_client: reqwest::Client,
    base_url: String,
    bearer_token: String,
}

impl HttpTimelineClient {
    /// Create new upstream client
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &UpstreamConfig) -> Result<Self, AppError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("featherlink/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            http_client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to reach {}: {}", path, e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound);
        }
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "{} returned HTTP {}",
                path, status
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Upstream(format!("Invalid {} payload: {}", path, e)))
    }
}

#[async_trait]
impl TimelineClient for HttpTimelineClient {
    async fn get_profile(&self, handle: &str) -> Result<Profile, AppError> {
        tracing::debug!(handle, "Fetching upstream profile");
        self.get_json("users/show.json", &[("screen_name", handle.to_string())])
            .await
    }

    async fn get_post(&self, id: u64) -> Result<Post, AppError> {
        tracing::debug!(id, "Fetching upstream post");
        self.get_json("statuses/show.json", &[("id", id.to_string())])
            .await
    }

    async fn get_timeline(&self, query: TimelineQuery) -> Result<Vec<Post>, AppError> {
        let mut params = vec![
            ("user_id", query.account_id.to_string()),
            ("count", query.count.to_string()),
            ("include_rts", u8::from(query.include_shares).to_string()),
        ];
        if let Some(since_id) = query.since_id {
            params.push(("since_id", since_id.to_string()));
        }

        tracing::debug!(
            account_id = query.account_id,
            since_id = ?query.since_id,
            "Fetching upstream timeline"
        );
        self.get_json("statuses/user_timeline.json", &params).await
    }
}
