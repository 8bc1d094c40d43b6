//! Topic URIs and URL layout
//!
//! A topic is either a profile feed or a single-post feed. Both of these
//! denote the same profile topic:
//! - `acct:alice@bridge.example.com`
//! - `https://bridge.example.com/@alice.atom`
//!
//! Single-post topics use `/@alice/status/<id>.atom`.

use crate::error::AppError;

/// Human-facing upstream web root
const UPSTREAM_WEB_ROOT: &str = "https://twitter.com";

/// Date component of `tag:` entry ids. Changing it changes every entry id.
const TAG_DATE: &str = "2017-04-23";

pub const HUB_PATH: &str = "/hub";
pub const SALMON_PATH: &str = "/salmon";
pub const WEBFINGER_PATH: &str = "/.well-known/webfinger";

/// Parsed topic
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    Profile { handle: String },
    Post { handle: String, id: u64 },
}

impl Topic {
    /// Account handle the topic belongs to
    pub fn handle(&self) -> &str {
        match self {
            Topic::Profile { handle } | Topic::Post { handle, .. } => handle,
        }
    }

    /// Bridge-relative feed path, inverse of [`parse_topic`]
    pub fn path(&self) -> String {
        match self {
            Topic::Profile { handle } => profile_feed_path(handle),
            Topic::Post { handle, id } => post_feed_path(handle, *id),
        }
    }
}

/// Parse a topic URI
///
/// Accepts `acct:` URIs, absolute http(s) URLs and bridge-relative paths.
///
/// # Errors
/// `AppError::InvalidTopic` when the URI matches none of the forms
pub fn parse_topic(uri: &str) -> Result<Topic, AppError> {
    let invalid = || AppError::InvalidTopic(uri.to_string());

    if let Some(opaque) = uri.strip_prefix("acct:") {
        let handle = opaque.split('@').next().unwrap_or_default();
        return valid_handle(handle)
            .map(|handle| Topic::Profile { handle })
            .ok_or_else(invalid);
    }

    let path = if uri.starts_with('/') {
        uri.split(['?', '#']).next().unwrap_or_default().to_string()
    } else {
        let parsed = url::Url::parse(uri).map_err(|_| invalid())?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid());
        }
        parsed.path().to_string()
    };

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match segments.as_slice() {
        [account] => {
            let handle = account_segment(account).ok_or_else(invalid)?;
            Ok(Topic::Profile { handle })
        }
        [account, "status", id] => {
            let handle = account
                .strip_prefix('@')
                .and_then(valid_handle)
                .ok_or_else(invalid)?;
            let id = id
                .trim_end_matches(".atom")
                .parse::<u64>()
                .map_err(|_| invalid())?;
            Ok(Topic::Post { handle, id })
        }
        _ => Err(invalid()),
    }
}

fn account_segment(segment: &str) -> Option<String> {
    segment
        .strip_prefix('@')
        .map(|rest| rest.trim_end_matches(".atom"))
        .and_then(valid_handle)
}

fn valid_handle(handle: &str) -> Option<String> {
    if handle.is_empty()
        || !handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return None;
    }
    Some(handle.to_string())
}

pub fn profile_feed_path(handle: &str) -> String {
    format!("/@{}.atom", handle)
}

pub fn post_feed_path(handle: &str, id: u64) -> String {
    format!("/@{}/status/{}.atom", handle, id)
}

/// Upstream profile page
pub fn profile_url(handle: &str) -> String {
    format!("{}/{}", UPSTREAM_WEB_ROOT, handle)
}

/// Upstream post page
pub fn post_url(handle: &str, id: u64) -> String {
    format!("{}/status/{}", profile_url(handle), id)
}

/// Upstream hashtag search page
pub fn hashtag_url(tag: &str) -> String {
    format!("{}/hashtag/{}", UPSTREAM_WEB_ROOT, urlencoding::encode(tag))
}

/// Bridge URL layout
#[derive(Debug, Clone)]
pub struct BridgeUrls {
    root_url: String,
    domain: String,
}

impl BridgeUrls {
    /// # Arguments
    /// * `root_url` - Public base URL (e.g. "https://bridge.example.com")
    /// * `domain` - Host part used in `acct:` and `tag:` URIs
    pub fn new(root_url: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            root_url: root_url.into().trim_end_matches('/').to_string(),
            domain: domain.into(),
        }
    }

    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// `acct:<handle>@<domain>`
    pub fn account_uri(&self, handle: &str) -> String {
        format!("acct:{}@{}", handle, self.domain)
    }

    /// Stable entry id for a post
    pub fn entry_id(&self, post_id: u64) -> String {
        format!("tag:{},{}:tweet:{}", self.domain, TAG_DATE, post_id)
    }

    pub fn profile_feed_url(&self, handle: &str) -> String {
        format!("{}{}", self.root_url, profile_feed_path(handle))
    }

    pub fn post_feed_url(&self, handle: &str, id: u64) -> String {
        format!("{}{}", self.root_url, post_feed_path(handle, id))
    }

    pub fn hub_url(&self) -> String {
        format!("{}{}", self.root_url, HUB_PATH)
    }

    pub fn salmon_url(&self) -> String {
        format!("{}{}", self.root_url, SALMON_PATH)
    }

    /// LRDD template advertised in host-meta
    pub fn webfinger_template(&self) -> String {
        format!("{}{}?resource={{uri}}", self.root_url, WEBFINGER_PATH)
    }
}
