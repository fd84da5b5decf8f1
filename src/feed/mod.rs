//! Feed source: fetches the syndication feed and parses it into items.
//!
//! The relay only depends on the [`FeedSource`] trait. [`HttpFeedSource`]
//! is the production implementation (HTTP GET + RSS/Atom parsing).

mod client;
mod parser;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::FeedItem;

pub use client::HttpFeedSource;
pub use parser::parse_feed;

/// Errors raised while fetching or parsing the feed
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} when fetching {url}")]
    Status { status: u16, url: String },

    #[error("Failed to parse feed: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, FeedError>;

/// Something that can produce the current, ordered list of feed items
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the full item list, in feed order
    async fn fetch(&self) -> Result<Vec<FeedItem>>;

    /// Human-readable description of the source (for logs)
    fn describe(&self) -> String;
}
