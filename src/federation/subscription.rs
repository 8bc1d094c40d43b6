//! Polling subscription manager
//!
//! The upstream service has no push API, so every subscribed topic gets
//! its own polling task. New posts are rendered into a feed delta and sent
//! to the subscriber's channel.

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::AppError;
use crate::feed::{Entry, Feed, FeedSynthesizer, ObjectType, Verb, parse_topic};
use crate::metrics::{
    ACTIVE_SUBSCRIPTIONS, DELIVERED_ENTRIES_TOTAL, DELIVERIES_TOTAL, POLLS_TOTAL,
};
use crate::upstream::{Profile, TimelineQuery};

/// Registered polling task
struct Subscription {
    /// Kept to identify the subscription on unsubscribe
    sender: mpsc::Sender<Feed>,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Subscription {
    async fn stop(self, topic: &str) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(topic, error = %e, "Polling task failed");
        }
    }
}

/// Per-topic polling state
struct Poller {
    synthesizer: FeedSynthesizer,
    topic: String,
    /// Feed owner, with its latest post kept current
    profile: Profile,
    /// Highest post id seen so far, 0 if none
    last_seen: u64,
    page_size: u32,
}

impl Poller {
    fn new(synthesizer: FeedSynthesizer, topic: String, profile: Profile, page_size: u32) -> Self {
        let last_seen = profile.status.as_ref().map(|s| s.id).unwrap_or(0);
        Self {
            synthesizer,
            topic,
            profile,
            last_seen,
            page_size,
        }
    }

    /// Fetch posts newer than `last_seen`
    ///
    /// Returns the delta feed, or `None` when there is nothing to deliver.
    async fn poll_once(&mut self) -> Option<Feed> {
        let query = TimelineQuery {
            account_id: self.profile.id,
            since_id: (self.last_seen != 0).then_some(self.last_seen),
            count: self.page_size,
            include_shares: true,
        };

        let mut posts = match self.synthesizer.client().get_timeline(query).await {
            Ok(posts) => posts,
            Err(e) => {
                POLLS_TOTAL.with_label_values(&["error"]).inc();
                tracing::warn!(topic = %self.topic, error = %e, "Cannot poll user");
                return None;
            }
        };

        posts.retain(|post| post.id > self.last_seen);
        let Some(newest) = posts.iter().max_by_key(|post| post.id) else {
            POLLS_TOTAL.with_label_values(&["empty"]).inc();
            return None;
        };
        self.last_seen = newest.id;
        self.profile.status = Some(newest.as_status_ref());

        POLLS_TOTAL.with_label_values(&["new_posts"]).inc();
        tracing::debug!(topic = %self.topic, posts = posts.len(), last_seen = self.last_seen, "Polled new posts");

        Some(self.synthesizer.profile_feed_with(&self.profile, &posts))
    }
}

type Registry = Arc<Mutex<HashMap<String, Subscription>>>;

/// Polling loop of one topic
///
/// Owns the delivery sender; it is dropped when the loop exits. Returns
/// `true` when the loop ended because the subscriber dropped its receiver.
async fn run(
    mut poller: Poller,
    sender: mpsc::Sender<Feed>,
    mut stop: watch::Receiver<bool>,
    period: Duration,
) -> bool {
    let mut tick = tokio::time::interval_at(Instant::now() + period, period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = tick.tick() => {}
        }

        let feed = tokio::select! {
            _ = stop.changed() => break,
            feed = poller.poll_once() => feed,
        };
        let Some(feed) = feed else {
            continue;
        };

        let entries = feed.entries.len() as u64;
        tokio::select! {
            _ = stop.changed() => break,
            sent = sender.send(feed) => {
                if sent.is_err() {
                    tracing::debug!(topic = %poller.topic, "Subscriber channel closed");
                    return true;
                }
                DELIVERIES_TOTAL.inc();
                DELIVERED_ENTRIES_TOTAL.inc_by(entries);
            }
        }
    }

    tracing::debug!(topic = %poller.topic, "Polling loop stopped");
    false
}

/// Drop the registry entry of a loop whose subscriber went away
///
/// A replacement subscription registered under the same key is left alone.
async fn prune(registry: &Registry, key: &str, sender: &mpsc::Sender<Feed>) {
    let mut topics = registry.lock().await;
    if topics
        .get(key)
        .is_some_and(|sub| sub.sender.same_channel(sender))
    {
        topics.remove(key);
        ACTIVE_SUBSCRIPTIONS.set(topics.len() as i64);
        tracing::info!(topic = key, "Removed subscription of closed channel");
    }
}

/// Subscription manager
///
/// Topics are keyed by their normalized feed path, so `acct:` and URL forms
/// of one account share a subscription. The registry lock is never held
/// across an upstream call or a task join. A loop whose subscriber dropped
/// its receiver removes its own registry entry.
pub struct SubscriptionManager {
    synthesizer: FeedSynthesizer,
    interval: Duration,
    page_size: u32,
    topics: Registry,
}

impl SubscriptionManager {
    /// # Arguments
    /// * `synthesizer` - Upstream client and renderer
    /// * `interval` - Time between polls of one topic
    /// * `page_size` - Maximum posts fetched per poll
    pub fn new(synthesizer: FeedSynthesizer, interval: Duration, page_size: u32) -> Self {
        Self {
            synthesizer,
            interval,
            page_size,
            topics: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start polling a topic
    ///
    /// Returns once the polling task is registered. The first poll happens
    /// one interval later. Subscribing to an already polled topic replaces
    /// the previous subscription.
    ///
    /// # Errors
    /// `InvalidTopic` for unparseable topics, upstream errors when the
    /// account cannot be fetched
    pub async fn subscribe(&self, topic_uri: &str, sender: mpsc::Sender<Feed>) -> Result<(), AppError> {
        let topic = parse_topic(topic_uri)?;
        let key = topic.path();
        let profile = self.synthesizer.client().get_profile(topic.handle()).await?;

        let poller = Poller::new(self.synthesizer.clone(), key.clone(), profile, self.page_size);
        let (stop_tx, stop_rx) = watch::channel(false);
        let registry = Arc::clone(&self.topics);
        let (task_key, watched, period) = (key.clone(), sender.clone(), self.interval);
        let task = tokio::spawn(async move {
            if run(poller, watched.clone(), stop_rx, period).await {
                prune(&registry, &task_key, &watched).await;
            }
        });

        let replaced = {
            let mut topics = self.topics.lock().await;
            let replaced = topics.insert(
                key.clone(),
                Subscription {
                    sender,
                    stop: stop_tx,
                    task,
                },
            );
            ACTIVE_SUBSCRIPTIONS.set(topics.len() as i64);
            replaced
        };

        if let Some(previous) = replaced {
            tracing::info!(topic = %key, "Replacing existing subscription");
            previous.stop(&key).await;
        }

        tracing::info!(topic = %key, interval_secs = self.interval.as_secs(), "Subscribed");
        Ok(())
    }

    /// Stop the subscription delivering to `sender`'s channel
    ///
    /// Unknown channels are ignored.
    pub async fn unsubscribe(&self, sender: &mpsc::Sender<Feed>) -> Result<(), AppError> {
        let removed = {
            let mut topics = self.topics.lock().await;
            let key = topics
                .iter()
                .find(|(_, sub)| sub.sender.same_channel(sender))
                .map(|(key, _)| key.clone());
            let removed = key.and_then(|key| topics.remove(&key).map(|sub| (key, sub)));
            ACTIVE_SUBSCRIPTIONS.set(topics.len() as i64);
            removed
        };

        match removed {
            Some((key, sub)) => {
                sub.stop(&key).await;
                tracing::info!(topic = %key, "Unsubscribed");
            }
            None => tracing::debug!("Unsubscribe for unknown channel ignored"),
        }

        Ok(())
    }

    /// Accept an inbound activity
    ///
    /// Follows and unfollows need no action since polling is driven by hub
    /// subscriptions. Everything else is rejected.
    pub fn notify(&self, entry: &Entry) -> Result<(), AppError> {
        if entry.object_type != ObjectType::Activity {
            return Err(AppError::UnsupportedActivity(format!(
                "object type {}",
                entry.object_type.as_uri()
            )));
        }

        match entry.verb {
            Verb::Follow | Verb::Unfollow => {
                tracing::debug!(id = %entry.id, verb = entry.verb.as_uri(), "Ignoring follow activity");
                Ok(())
            }
            _ => Err(AppError::UnsupportedActivity(format!(
                "verb {}",
                entry.verb.as_uri()
            ))),
        }
    }

    /// Normalized keys of all polled topics
    pub async fn topics(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.topics.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Stop every polling task
    pub async fn shutdown(&self) {
        let drained: Vec<(String, Subscription)> = {
            let mut topics = self.topics.lock().await;
            ACTIVE_SUBSCRIPTIONS.set(0);
            topics.drain().collect()
        };

        let count = drained.len();
        join_all(drained.into_iter().map(|(key, sub)| async move {
            sub.stop(&key).await;
        }))
        .await;

        tracing::info!(count, "Stopped all subscriptions");
    }
}
