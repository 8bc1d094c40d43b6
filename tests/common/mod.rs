//! Common test utilities for E2E tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use featherlink::error::AppError;
use featherlink::upstream::{Entities, Post, Profile, TimelineClient, TimelineQuery};
use featherlink::{AppState, config};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const DOMAIN: &str = "test.example.com";

/// In-memory upstream service
#[derive(Default)]
pub struct FakeTimeline {
    profiles: Mutex<Vec<Profile>>,
    posts: Mutex<Vec<Post>>,
}

impl FakeTimeline {
    pub fn add_profile(&self, profile: Profile) {
        self.profiles.lock().unwrap().push(profile);
    }

    /// Publish a post and update its author's latest status
    pub fn publish(&self, post: Post) {
        let mut profiles = self.profiles.lock().unwrap();
        if let Some(profile) = profiles.iter_mut().find(|p| p.id == post.user.id) {
            profile.status = Some(post.as_status_ref());
        }
        self.posts.lock().unwrap().push(post);
    }
}

#[async_trait]
impl TimelineClient for FakeTimeline {
    async fn get_profile(&self, handle: &str) -> Result<Profile, AppError> {
        self.profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.screen_name == handle)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn get_post(&self, id: u64) -> Result<Post, AppError> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn get_timeline(&self, query: TimelineQuery) -> Result<Vec<Post>, AppError> {
        let mut posts: Vec<Post> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user.id == query.account_id)
            .filter(|p| query.since_id.is_none_or(|since| p.id > since))
            .filter(|p| query.include_shares || p.retweeted_status.is_none())
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.id.cmp(&a.id));
        posts.truncate(query.count as usize);
        Ok(posts)
    }
}

pub fn profile(id: u64, handle: &str) -> Profile {
    Profile {
        id,
        screen_name: handle.to_string(),
        name: format!("{} display", handle),
        description: Some(format!("{} bio", handle)),
        profile_image_url_https: Some(format!("https://img.example/{}.png", handle)),
        profile_banner_url: None,
        status: None,
    }
}

pub fn post(id: u64, author: &Profile, text: &str) -> Post {
    Post {
        id,
        text: text.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(id as i64),
        user: Profile {
            status: None,
            ..author.clone()
        },
        lang: Some("en".to_string()),
        entities: Entities::default(),
        retweeted_status: None,
        in_reply_to_status_id: None,
        in_reply_to_screen_name: None,
    }
}

/// Test configuration pointing at a database under `temp_dir`
pub fn test_config(temp_dir: &TempDir, poll_interval_seconds: u64) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            domain: DOMAIN.to_string(),
            protocol: "https".to_string(),
        },
        database: config::DatabaseConfig {
            path: temp_dir.path().join("test.db"),
        },
        upstream: config::UpstreamConfig {
            api_base_url: "http://127.0.0.1:9".to_string(),
            bearer_token: "test-token".to_string(),
            timeout_seconds: 5,
        },
        polling: config::PollingConfig {
            interval_seconds: poll_interval_seconds,
            page_size: 200,
        },
        feed: config::FeedConfig { page_size: 20 },
        keys: config::KeyConfig { bits: 1024 },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub upstream: Arc<FakeTimeline>,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server with `alice` (posts 1 and 2) and `bob` (no posts)
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir, 900);

        let upstream = Arc::new(FakeTimeline::default());
        let alice = profile(1, "alice");
        upstream.add_profile(alice.clone());
        upstream.add_profile(profile(2, "bob"));
        upstream.publish(post(1, &alice, "first"));
        upstream.publish(post(2, &alice, "second\nline"));

        let state = AppState::with_client(config, upstream.clone()).await.unwrap();

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = featherlink::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: format!("http://{}", addr),
            state,
            upstream,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }
}
