//! feedrelay - Relay new syndication feed items to a Telegram channel
//!
//! Polls one RSS/Atom feed on a fixed cadence, formats every item that has
//! not been sent before and posts it to a single channel. The identities of
//! delivered items are kept in a plain-text file so a restart does not
//! repost old items.
//!
//! # Delivery guarantees
//!
//! Delivery is at-least-once:
//! - An identity is recorded only after the channel accepted the message
//! - The record is flushed once per cycle, so a crash mid-cycle can repost
//! - Failed deliveries are retried on the next cycle
//!
//! # Modules
//!
//! - `adapters`: Delivery client trait and the Telegram Bot API client
//! - `feed`: Feed source trait, HTTP client and RSS/Atom parser
//! - `core`: Identity, record store, formatter, relay cycle, scheduler
//! - `domain`: Data structures (FeedItem, OutboundMessage, CycleReport)
//! - `config`: Config file / environment resolution
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Run forever (credentials from .env or FEEDRELAY_* variables)
//! feedrelay
//!
//! # Single cycle, e.g. from cron
//! feedrelay once
//!
//! # Preview what would be sent
//! feedrelay pending
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod feed;

// Re-export main types at crate root for convenience
pub use adapters::{DeliveryClient, DeliveryError, TelegramClient};
pub use config::{ConfigError, RelayConfig};
pub use crate::core::{IdentityKind, IdentityStore, Relay, RelayPolicy, Scheduler, SentRecord};
pub use domain::{CycleOutcome, CycleReport, FeedItem, OutboundMessage, ParseMode};
pub use feed::{FeedError, FeedSource, HttpFeedSource};
