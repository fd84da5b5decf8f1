//! Shared fakes for relay integration tests.
//!
//! `FakeFeed` and `FakeChannel` hand out cloneable handles so a test can
//! keep inspecting them after the relay takes ownership of the boxes.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use feedrelay::adapters::{DeliveryClient, DeliveryError};
use feedrelay::core::{IdentityKind, IdentityStore, Relay, RelayPolicy};
use feedrelay::domain::{FeedItem, OutboundMessage};
use feedrelay::feed::{FeedError, FeedSource};

/// Feed whose snapshot can be swapped between cycles
#[derive(Clone)]
pub struct FakeFeed {
    snapshot: Arc<Mutex<Result<Vec<FeedItem>, String>>>,
    fetches: Arc<AtomicUsize>,
}

impl Default for FakeFeed {
    fn default() -> Self {
        Self {
            snapshot: Arc::new(Mutex::new(Ok(Vec::new()))),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl FakeFeed {
    pub fn with_items(items: Vec<FeedItem>) -> Self {
        let feed = Self::default();
        feed.set_items(items);
        feed
    }

    pub fn set_items(&self, items: Vec<FeedItem>) {
        *self.snapshot.lock().unwrap() = Ok(items);
    }

    pub fn set_error(&self, error: &str) {
        *self.snapshot.lock().unwrap() = Err(error.to_string());
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for FakeFeed {
    async fn fetch(&self) -> Result<Vec<FeedItem>, FeedError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.snapshot
            .lock()
            .unwrap()
            .clone()
            .map_err(FeedError::Parse)
    }

    fn describe(&self) -> String {
        "fake://feed".to_string()
    }
}

/// Channel that records delivered messages and rejects configured links
#[derive(Clone, Default)]
pub struct FakeChannel {
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    failing_links: Arc<Mutex<HashSet<String>>>,
    attempts: Arc<AtomicUsize>,
}

impl FakeChannel {
    pub fn fail_link(&self, link: &str) {
        self.failing_links.lock().unwrap().insert(link.to_string());
    }

    pub fn heal_link(&self, link: &str) {
        self.failing_links.lock().unwrap().remove(link);
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Total delivery attempts, including rejected ones
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeliveryClient for FakeChannel {
    fn destination(&self) -> &str {
        "@fake"
    }

    async fn deliver(&self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let rejected = self
            .failing_links
            .lock()
            .unwrap()
            .iter()
            .any(|link| message.text.contains(&format!("href=\"{}\"", link)));

        if rejected {
            return Err(DeliveryError::Api("Bad Request: fake rejection".to_string()));
        }

        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub fn item(title: &str, link: &str) -> FeedItem {
    FeedItem::new(title, link)
}

/// Build a relay over the fakes with title identity and no attempt cap
pub fn relay(feed: &FakeFeed, channel: &FakeChannel, state_path: &Path) -> Relay {
    relay_with(feed, channel, state_path, IdentityKind::Title, RelayPolicy::default())
}

pub fn relay_with(
    feed: &FakeFeed,
    channel: &FakeChannel,
    state_path: &Path,
    identity: IdentityKind,
    policy: RelayPolicy,
) -> Relay {
    Relay::new(
        Box::new(feed.clone()),
        Box::new(channel.clone()),
        identity.build(),
        IdentityStore::new(state_path),
    )
    .with_policy(policy)
}
