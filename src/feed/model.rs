//! Feed models
//!
//! Atom feeds carrying ActivityStreams 1.0 annotations, the format
//! OStatus subscribers expect.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Public addressing collection used in `mentioned` links
pub const COLLECTION_PUBLIC: &str = "http://activityschema.org/collection/public";

// =============================================================================
// Classification
// =============================================================================

/// ActivityStreams object type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ObjectType {
    Activity,
    Note,
    Comment,
    Person,
    Collection,
    /// Any object type the bridge does not produce
    Other(String),
}

impl ObjectType {
    pub fn as_uri(&self) -> &str {
        match self {
            ObjectType::Activity => "http://activitystrea.ms/schema/1.0/activity",
            ObjectType::Note => "http://activitystrea.ms/schema/1.0/note",
            ObjectType::Comment => "http://activitystrea.ms/schema/1.0/comment",
            ObjectType::Person => "http://activitystrea.ms/schema/1.0/person",
            ObjectType::Collection => "http://activitystrea.ms/schema/1.0/collection",
            ObjectType::Other(uri) => uri,
        }
    }
}

/// ActivityStreams verb
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Verb {
    Post,
    Share,
    Follow,
    Unfollow,
    Other(String),
}

impl Verb {
    pub fn as_uri(&self) -> &str {
        match self {
            Verb::Post => "http://activitystrea.ms/schema/1.0/post",
            Verb::Share => "http://activitystrea.ms/schema/1.0/share",
            Verb::Follow => "http://activitystrea.ms/schema/1.0/follow",
            Verb::Unfollow => "http://ostatus.org/schema/1.0/unfollow",
            Verb::Other(uri) => uri,
        }
    }
}

// =============================================================================
// Building blocks
// =============================================================================

/// Atom link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub rel: String,
    pub media_type: Option<String>,
    pub href: String,
    pub object_type: Option<ObjectType>,
}

impl Link {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            media_type: None,
            href: href.into(),
            object_type: None,
        }
    }

    pub fn with_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn with_object_type(mut self, object_type: ObjectType) -> Self {
        self.object_type = Some(object_type);
        self
    }
}

/// Author block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Person {
    /// `acct:` URI
    pub id: String,
    pub name: String,
    pub email: String,
    pub summary: String,
    pub links: Vec<Link>,
    pub preferred_username: String,
}

/// Entry body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Content {
    /// Atom text construct type, always "html" for rendered posts
    pub kind: String,
    /// Omitted when the language is undetermined
    pub lang: Option<String>,
    pub body: String,
}

/// `thr:in-reply-to` reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InReplyTo {
    /// Entry id of the replied-to post
    pub reference: String,
    /// Human-facing URL of the replied-to post
    pub href: String,
    pub media_type: String,
}

// =============================================================================
// Entry / Feed
// =============================================================================

/// One activity derived from one source post
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub id: String,
    pub title: String,
    pub published: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub links: Vec<Link>,
    pub content: Content,
    /// Set only when the post's author is not the feed owner
    pub author: Option<Person>,
    pub object_type: ObjectType,
    pub verb: Verb,
    pub in_reply_to: Option<InReplyTo>,
    /// Shared post, for shares
    pub object: Option<Box<Entry>>,
}

/// A full or delta feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feed {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub logo: Option<String>,
    pub updated: DateTime<Utc>,
    pub links: Vec<Link>,
    pub author: Option<Person>,
    pub entries: Vec<Entry>,
}
