//! Upstream timeline models
//!
//! Mirrors the subset of the REST API v1.1 JSON payloads the bridge reads.
//! Entity offsets are Unicode code points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Profile
// =============================================================================

/// An upstream account (`users/show.json`, or `user` inside a post)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: u64,
    pub screen_name: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub profile_image_url_https: Option<String>,
    #[serde(default)]
    pub profile_banner_url: Option<String>,
    /// Latest post, absent when the account never posted
    #[serde(default)]
    pub status: Option<StatusRef>,
}

/// The abbreviated latest post embedded in a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRef {
    pub id: u64,
    #[serde(with = "created_at_format")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Post
// =============================================================================

/// A single upstream post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub text: String,
    #[serde(with = "created_at_format")]
    pub created_at: DateTime<Utc>,
    pub user: Profile,
    /// BCP47 tag, "und" when undetermined
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub entities: Entities,
    /// Wrapped post when this one is a share
    #[serde(default)]
    pub retweeted_status: Option<Box<Post>>,
    #[serde(default)]
    pub in_reply_to_status_id: Option<u64>,
    #[serde(default)]
    pub in_reply_to_screen_name: Option<String>,
}

impl Post {
    /// Reference usable as a profile's latest post
    pub fn as_status_ref(&self) -> StatusRef {
        StatusRef {
            id: self.id,
            created_at: self.created_at,
        }
    }
}

/// Entity annotations of a post's text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub urls: Vec<UrlEntity>,
    #[serde(default)]
    pub user_mentions: Vec<MentionEntity>,
    #[serde(default)]
    pub hashtags: Vec<HashtagEntity>,
    #[serde(default)]
    pub media: Vec<MediaEntity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlEntity {
    pub indices: Vec<usize>,
    pub url: String,
    #[serde(default)]
    pub display_url: Option<String>,
    #[serde(default)]
    pub expanded_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionEntity {
    pub indices: Vec<usize>,
    pub screen_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashtagEntity {
    pub indices: Vec<usize>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEntity {
    pub indices: Vec<usize>,
    pub media_url: String,
}

/// `created_at` uses the legacy "Wed Oct 10 20:19:24 +0000 2018" layout
mod created_at_format {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_str(&raw, FORMAT)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_deserialize_timeline_post() {
        let raw = serde_json::json!({
            "id": 1050118621198921728u64,
            "text": "hi @bob #rust",
            "created_at": "Wed Oct 10 20:19:24 +0000 2018",
            "lang": "en",
            "user": {
                "id": 6253282,
                "screen_name": "alice",
                "name": "Alice",
                "description": null
            },
            "entities": {
                "user_mentions": [{"indices": [3, 7], "screen_name": "bob"}],
                "hashtags": [{"indices": [8, 13], "text": "rust"}]
            },
            "in_reply_to_status_id": null
        });

        let post: Post = serde_json::from_value(raw).unwrap();
        assert_eq!(post.id, 1050118621198921728);
        assert_eq!(
            post.created_at,
            Utc.with_ymd_and_hms(2018, 10, 10, 20, 19, 24).unwrap()
        );
        assert_eq!(post.user.screen_name, "alice");
        assert_eq!(post.entities.user_mentions[0].indices, vec![3, 7]);
        assert!(post.entities.urls.is_empty());
        assert!(post.retweeted_status.is_none());
        assert!(post.in_reply_to_status_id.is_none());
    }

    #[test]
    fn test_profile_without_status() {
        let raw = serde_json::json!({
            "id": 1,
            "screen_name": "quiet",
            "name": "Quiet"
        });

        let profile: Profile = serde_json::from_value(raw).unwrap();
        assert!(profile.status.is_none());
        assert!(profile.profile_image_url_https.is_none());
    }
}
