//! Domain types for the relay.
//!
//! This module contains the core data structures:
//! - FeedItem: One entry fetched from the feed
//! - OutboundMessage: Formatted text handed to the delivery client
//! - Cycle: State and outcome of one relay cycle

pub mod cycle;
pub mod item;
pub mod message;

// Re-export commonly used types
pub use cycle::{CycleOutcome, CycleReport, RelayState};
pub use item::FeedItem;
pub use message::{OutboundMessage, ParseMode};
