//! Bridge backend
//!
//! Everything the OStatus protocol layer needs from the bridge, split into
//! capability traits so handlers only depend on what they use.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::federation::{
    KeyCache, SubscriptionManager, WebFingerResponse, public_key_data_url, resource_document,
};
use crate::feed::{BridgeUrls, Entry, Feed, FeedSynthesizer, parse_topic};

/// Hub-facing subscription control
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Start delivering feed deltas of `topic` to `sender`
    async fn subscribe(&self, topic: &str, sender: mpsc::Sender<Feed>) -> Result<(), AppError>;

    /// Stop the subscription delivering to `sender`'s channel
    async fn unsubscribe(&self, sender: &mpsc::Sender<Feed>) -> Result<(), AppError>;
}

/// Inbound salmon activities
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, entry: &Entry) -> Result<(), AppError>;
}

/// Full feed of a topic
#[async_trait]
pub trait FeedProvider: Send + Sync {
    async fn feed(&self, topic: &str) -> Result<Feed, AppError>;
}

/// WebFinger resource lookup
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    async fn resource(&self, uri: &str) -> Result<WebFingerResponse, AppError>;
}

/// Bridge backend
pub struct Backend {
    synthesizer: FeedSynthesizer,
    subscriptions: SubscriptionManager,
    keys: Arc<KeyCache>,
}

impl Backend {
    pub fn new(
        synthesizer: FeedSynthesizer,
        subscriptions: SubscriptionManager,
        keys: Arc<KeyCache>,
    ) -> Self {
        Self {
            synthesizer,
            subscriptions,
            keys,
        }
    }

    pub fn urls(&self) -> &BridgeUrls {
        self.synthesizer.renderer().urls()
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    /// Stop every polling task
    pub async fn shutdown(&self) {
        self.subscriptions.shutdown().await;
    }

    /// Reject `acct:` URIs addressed to another domain
    fn check_domain(&self, uri: &str) -> Result<(), AppError> {
        let domain = uri
            .strip_prefix("acct:")
            .and_then(|acct| acct.split_once('@'))
            .map(|(_, domain)| domain);

        match domain {
            Some(domain) if !domain.eq_ignore_ascii_case(self.urls().domain()) => {
                Err(AppError::NotFound)
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Subscriber for Backend {
    async fn subscribe(&self, topic: &str, sender: mpsc::Sender<Feed>) -> Result<(), AppError> {
        self.subscriptions.subscribe(topic, sender).await
    }

    async fn unsubscribe(&self, sender: &mpsc::Sender<Feed>) -> Result<(), AppError> {
        self.subscriptions.unsubscribe(sender).await
    }
}

#[async_trait]
impl Notifier for Backend {
    async fn notify(&self, entry: &Entry) -> Result<(), AppError> {
        self.subscriptions.notify(entry)
    }
}

#[async_trait]
impl FeedProvider for Backend {
    async fn feed(&self, topic: &str) -> Result<Feed, AppError> {
        self.synthesizer.feed(topic).await
    }
}

#[async_trait]
impl ResourceProvider for Backend {
    async fn resource(&self, uri: &str) -> Result<WebFingerResponse, AppError> {
        self.check_domain(uri)?;
        let topic = parse_topic(uri)?;

        let profile = self.synthesizer.client().get_profile(topic.handle()).await?;
        let key = self.keys.get_or_create(profile.id).await?;

        Ok(resource_document(
            self.urls(),
            &profile,
            public_key_data_url(&key),
        ))
    }
}
