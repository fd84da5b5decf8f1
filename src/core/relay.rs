//! One relay cycle: fetch, filter, deliver, persist.
//!
//! Every steady-state error is handled here and turned into a log line and
//! a field on the [`CycleReport`]; nothing propagates to the caller.

use std::collections::{HashMap, HashSet};

use tracing::{debug, error, info, instrument, warn};

use crate::adapters::DeliveryClient;
use crate::domain::{CycleOutcome, CycleReport, FeedItem, RelayState};
use crate::feed::{FeedError, FeedSource};

use super::format::format_item;
use super::identity::{normalize, Identity};
use super::store::{IdentityStore, SentRecord};

/// Delivery policy knobs
#[derive(Debug, Clone, Default)]
pub struct RelayPolicy {
    /// Give up on an item after this many failed deliveries (per process).
    /// `None` retries every cycle indefinitely.
    pub max_delivery_attempts: Option<u32>,
}

/// An item that passed the filter, with its normalized identity
#[derive(Debug, Clone)]
pub struct Candidate {
    pub identity: String,
    pub item: FeedItem,
}

/// Result of the filtering step
#[derive(Debug, Default)]
pub struct FilterResult {
    /// Items not yet in the record, in feed order
    pub candidates: Vec<Candidate>,

    /// Items skipped because the record already has them
    pub already_sent: usize,

    /// Items skipped because their identity normalized to an empty string
    pub unidentified: usize,
}

/// Select the items whose normalized identity is not in `record`.
///
/// Duplicates inside `items` are kept; the delivery step re-checks the
/// record before each send so only the first successful one goes out.
pub fn filter_new(items: Vec<FeedItem>, record: &SentRecord, identity: &dyn Identity) -> FilterResult {
    let mut result = FilterResult::default();

    for item in items {
        let key = normalize(&identity.key(&item));

        if key.is_empty() {
            warn!(link = %item.link, "Skipping item with empty {} identity", identity.name());
            result.unidentified += 1;
            continue;
        }

        if record.contains(&key) {
            result.already_sent += 1;
            continue;
        }

        result.candidates.push(Candidate {
            identity: key,
            item,
        });
    }

    result
}

/// The relay: composes the feed source, formatter, delivery client and store
pub struct Relay {
    source: Box<dyn FeedSource>,
    delivery: Box<dyn DeliveryClient>,
    identity: Box<dyn Identity>,
    store: IdentityStore,
    policy: RelayPolicy,
    failures: HashMap<String, u32>,
    state: RelayState,
}

impl Relay {
    /// Create a relay with the default policy
    pub fn new(
        source: Box<dyn FeedSource>,
        delivery: Box<dyn DeliveryClient>,
        identity: Box<dyn Identity>,
        store: IdentityStore,
    ) -> Self {
        Self {
            source,
            delivery,
            identity,
            store,
            policy: RelayPolicy::default(),
            failures: HashMap::new(),
            state: RelayState::Idle,
        }
    }

    /// Set the delivery policy
    pub fn with_policy(mut self, policy: RelayPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Current state (always `Idle` between cycles)
    pub fn state(&self) -> RelayState {
        self.state
    }

    /// The backing store
    pub fn store(&self) -> &IdentityStore {
        &self.store
    }

    /// Failed delivery attempts so far for an identity
    pub fn failed_attempts(&self, identity: &str) -> u32 {
        self.failures.get(identity).copied().unwrap_or(0)
    }

    fn transition(&mut self, next: RelayState) {
        debug!(from = %self.state, to = %next, "Relay state change");
        self.state = next;
    }

    /// Fetch the feed and return the items that would be delivered, without
    /// sending anything or touching the record
    pub async fn pending(&self, record: &SentRecord) -> Result<Vec<Candidate>, FeedError> {
        let items = self.source.fetch().await?;
        let mut preview = record.clone();
        let mut pending = Vec::new();

        for candidate in filter_new(items, record, self.identity.as_ref()).candidates {
            if preview.contains(&candidate.identity) {
                continue;
            }
            preview.push(candidate.identity.clone());
            pending.push(candidate);
        }

        Ok(pending)
    }

    /// Run one full cycle against `record`
    #[instrument(skip_all, fields(source = %self.source.describe()))]
    pub async fn run_cycle(&mut self, record: &mut SentRecord) -> CycleReport {
        let mut report = CycleReport::start();

        self.transition(RelayState::Fetching);
        let items = match self.source.fetch().await {
            Ok(items) => items,
            Err(e) => {
                error!("Failed to fetch feed: {}", e);
                self.transition(RelayState::Idle);
                return report.finish(CycleOutcome::FetchFailed {
                    error: e.to_string(),
                });
            }
        };
        report.fetched = items.len();

        self.transition(RelayState::Filtering);
        let filtered = filter_new(items, record, self.identity.as_ref());
        report.already_sent = filtered.already_sent;
        report.unidentified = filtered.unidentified;

        self.transition(RelayState::Delivering);
        let in_snapshot: HashSet<String> = filtered
            .candidates
            .iter()
            .map(|c| c.identity.clone())
            .collect();
        for candidate in filtered.candidates {
            self.deliver_one(candidate, record, &mut report).await;
        }

        // Items that left the feed will never be retried
        self.failures.retain(|identity, _| in_snapshot.contains(identity));

        self.transition(RelayState::Persisting);
        match self.store.persist(record).await {
            Ok(()) => report.persisted = true,
            Err(e) => error!("{}", e),
        }

        self.transition(RelayState::Idle);
        report.finish(CycleOutcome::Completed)
    }

    async fn deliver_one(
        &mut self,
        candidate: Candidate,
        record: &mut SentRecord,
        report: &mut CycleReport,
    ) {
        let Candidate { identity, item } = candidate;

        // Same identity earlier in this snapshot was already delivered
        if record.contains(&identity) {
            report.already_sent += 1;
            return;
        }

        if let Some(max) = self.policy.max_delivery_attempts {
            if self.failed_attempts(&identity) >= max {
                debug!(%identity, "Skipping item that exhausted its delivery attempts");
                report.gave_up.push(identity);
                return;
            }
        }

        let message = format_item(&item);

        match self.delivery.deliver(&message).await {
            Ok(()) => {
                info!(%identity, destination = %self.delivery.destination(), "Message sent");
                debug!(text = %message.text, "Delivered message body");
                self.failures.remove(&identity);
                record.push(identity.clone());
                report.delivered.push(identity);
            }
            Err(e) => {
                error!(%identity, "Failed to deliver message: {}", e);
                let attempts = self.failures.entry(identity.clone()).or_insert(0);
                *attempts += 1;

                if self.policy.max_delivery_attempts == Some(*attempts) {
                    warn!(%identity, attempts = *attempts, "Giving up on item after repeated delivery failures");
                }
                report.failed.push(identity);
            }
        }
    }
}
