//! Feed module
//!
//! Handles:
//! - Topic URI parsing and bridge URL layout
//! - Post → entry rendering (classification, link rewriting)
//! - Profile and single-post feed synthesis
//! - Atom serialization

mod atom;
mod model;
mod render;
mod synth;
mod topic;

pub use atom::{ATOM_CONTENT_TYPE, to_atom};
pub use model::{
    COLLECTION_PUBLIC, Content, Entry, Feed, InReplyTo, Link, ObjectType, Person, Verb,
};
pub use render::{EntryRenderer, Span, collect_spans, format_text, rewrite_spans};
pub use synth::FeedSynthesizer;
pub use topic::{
    BridgeUrls, HUB_PATH, SALMON_PATH, Topic, WEBFINGER_PATH, hashtag_url, parse_topic,
    post_feed_path, post_url, profile_feed_path, profile_url,
};
