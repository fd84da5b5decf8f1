//! State and outcome of a single relay cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where the relay currently is within a cycle.
///
/// `Idle -> Fetching -> Filtering -> Delivering -> Persisting -> Idle`.
/// A failed fetch goes straight back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayState {
    Idle,
    Fetching,
    Filtering,
    Delivering,
    Persisting,
}

impl std::fmt::Display for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RelayState::Idle => "idle",
            RelayState::Fetching => "fetching",
            RelayState::Filtering => "filtering",
            RelayState::Delivering => "delivering",
            RelayState::Persisting => "persisting",
        };
        f.write_str(name)
    }
}

/// How a cycle ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Fetch succeeded and every step ran (individual deliveries may still have failed)
    Completed,

    /// The feed could not be fetched or parsed; nothing else ran
    FetchFailed { error: String },
}

/// Summary of one relay cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    /// When the cycle started
    pub started_at: DateTime<Utc>,

    /// When the cycle finished
    pub completed_at: Option<DateTime<Utc>>,

    /// Number of items the feed returned
    pub fetched: usize,

    /// Items skipped because they were already recorded
    pub already_sent: usize,

    /// Identities delivered this cycle, in delivery order
    pub delivered: Vec<String>,

    /// Identities whose delivery failed this cycle
    pub failed: Vec<String>,

    /// Identities skipped because they hit the delivery attempt cap
    pub gave_up: Vec<String>,

    /// Items skipped because their identity was empty
    pub unidentified: usize,

    /// Whether the record was written to disk at the end of the cycle
    pub persisted: bool,

    /// How the cycle ended
    pub outcome: CycleOutcome,
}

impl CycleReport {
    /// Start a new report stamped with the current time
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            completed_at: None,
            fetched: 0,
            already_sent: 0,
            delivered: Vec::new(),
            failed: Vec::new(),
            gave_up: Vec::new(),
            unidentified: 0,
            persisted: false,
            outcome: CycleOutcome::Completed,
        }
    }

    /// Mark the report finished with the given outcome
    pub fn finish(mut self, outcome: CycleOutcome) -> Self {
        self.outcome = outcome;
        self.completed_at = Some(Utc::now());
        self
    }

    /// Whether the fetch step failed
    pub fn fetch_failed(&self) -> bool {
        matches!(self.outcome, CycleOutcome::FetchFailed { .. })
    }

    /// Duration of the cycle in milliseconds (if finished)
    pub fn duration_ms(&self) -> Option<i64> {
        self.completed_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}
