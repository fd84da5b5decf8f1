use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::parser::parse_feed;
use super::{FeedError, FeedSource};
use crate::domain::FeedItem;

/// Feed source that downloads a single RSS/Atom URL over HTTP
pub struct HttpFeedSource {
    url: String,
    client: Client,
}

impl HttpFeedSource {
    /// Create a source for `url` with a per-request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("feedrelay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(url, client))
    }

    /// Create a source with a custom reqwest Client
    pub fn with_client(url: impl Into<String>, client: Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self) -> super::Result<Vec<FeedItem>> {
        tracing::debug!("Fetching feed from: {}", self.url);

        let response = self.client.get(&self.url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let bytes = response.bytes().await?;
        let items = parse_feed(&bytes)?;

        tracing::debug!("Parsed {} items from feed", items.len());
        Ok(items)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}
