//! Core relay logic.
//!
//! This module contains:
//! - Identity: How an item's "already sent" key is derived
//! - Store: The persisted sent-items record
//! - Format: Feed item to outbound message
//! - Relay: One fetch/filter/deliver/persist cycle
//! - Scheduler: Fixed-cadence loop with cancellation

pub mod format;
pub mod identity;
pub mod relay;
pub mod scheduler;
pub mod store;

// Re-export commonly used types
pub use format::format_item;
pub use identity::{normalize, GuidIdentity, Identity, IdentityKind, LinkIdentity, TitleIdentity};
pub use relay::{filter_new, Candidate, FilterResult, Relay, RelayPolicy};
pub use scheduler::{shutdown_signal, Scheduler};
pub use store::{contains, IdentityStore, SentRecord, StateLock, StoreError};
