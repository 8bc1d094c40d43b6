//! Feed synthesis
//!
//! Builds profile and single-post feeds from the upstream client.

use chrono::Utc;
use std::sync::Arc;

use super::model::{Feed, Link};
use super::render::EntryRenderer;
use super::topic::{Topic, parse_topic, profile_url};
use crate::error::AppError;
use crate::upstream::{Post, Profile, TimelineClient, TimelineQuery};

/// Feed synthesizer
///
/// Upstream errors are propagated as-is; retrying is the caller's call.
#[derive(Clone)]
pub struct FeedSynthesizer {
    client: Arc<dyn TimelineClient>,
    renderer: EntryRenderer,
    /// Posts per profile feed
    page_size: u32,
}

impl FeedSynthesizer {
    pub fn new(client: Arc<dyn TimelineClient>, renderer: EntryRenderer, page_size: u32) -> Self {
        Self {
            client,
            renderer,
            page_size,
        }
    }

    pub fn client(&self) -> &Arc<dyn TimelineClient> {
        &self.client
    }

    pub fn renderer(&self) -> &EntryRenderer {
        &self.renderer
    }

    /// Feed for any topic URI
    ///
    /// # Errors
    /// `InvalidTopic` for unparseable URIs, otherwise as the specific feed
    pub async fn feed(&self, topic_uri: &str) -> Result<Feed, AppError> {
        match parse_topic(topic_uri)? {
            Topic::Post { id, .. } => self.post_feed(id).await,
            Topic::Profile { handle } => self.profile_feed(&handle).await,
        }
    }

    /// Latest posts of an account, shares included
    pub async fn profile_feed(&self, handle: &str) -> Result<Feed, AppError> {
        let profile = self.client.get_profile(handle).await?;
        let posts = self
            .client
            .get_timeline(TimelineQuery {
                account_id: profile.id,
                since_id: None,
                count: self.page_size,
                include_shares: true,
            })
            .await?;

        tracing::debug!(handle, posts = posts.len(), "Synthesized profile feed");
        Ok(self.profile_feed_with(&profile, &posts))
    }

    /// Profile feed metadata with one entry per post, in the given order
    pub fn profile_feed_with(&self, profile: &Profile, posts: &[Post]) -> Feed {
        let urls = self.renderer.urls();
        let feed_url = urls.profile_feed_url(&profile.screen_name);
        let updated = profile
            .status
            .as_ref()
            .map(|status| status.created_at)
            .unwrap_or_else(Utc::now);

        Feed {
            id: feed_url.clone(),
            title: profile.name.clone(),
            subtitle: profile.description.clone().unwrap_or_default(),
            logo: profile.profile_image_url_https.clone(),
            updated,
            links: vec![
                Link::new("alternate", profile_url(&profile.screen_name)).with_type("text/html"),
                Link::new("self", feed_url).with_type("application/atom+xml"),
                Link::new("hub", urls.hub_url()),
                Link::new("salmon", urls.salmon_url()),
            ],
            author: Some(self.renderer.person(profile)),
            entries: posts
                .iter()
                .map(|post| self.renderer.render(profile, post))
                .collect(),
        }
    }

    /// Feed holding exactly one post
    ///
    /// There is no feed owner here, so the entry always carries its author.
    pub async fn post_feed(&self, id: u64) -> Result<Feed, AppError> {
        let post = self.client.get_post(id).await?;
        let author = self.renderer.person(&post.user);

        let mut entry = self.renderer.render(&post.user, &post);
        entry.author = Some(author.clone());

        let urls = self.renderer.urls();
        let feed_url = urls.post_feed_url(&post.user.screen_name, post.id);

        Ok(Feed {
            id: feed_url.clone(),
            title: post.user.name.clone(),
            subtitle: String::new(),
            logo: post.user.profile_image_url_https.clone(),
            updated: post.created_at,
            links: vec![Link::new("self", feed_url).with_type("application/atom+xml")],
            author: Some(author),
            entries: vec![entry],
        })
    }
}
