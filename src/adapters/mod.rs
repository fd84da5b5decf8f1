//! Adapter interfaces for external systems.
//!
//! The relay hands formatted messages to a [`DeliveryClient`]. The only
//! production implementation is the Telegram Bot API client.

pub mod telegram;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::OutboundMessage;

// Re-export the Telegram adapter
pub use telegram::TelegramClient;

/// Errors raised while delivering a message
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Request to delivery API failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Delivery API rejected the message: {0}")]
    Api(String),
}

/// Trait for the single messaging destination
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    /// Human-readable destination name (for logs)
    fn destination(&self) -> &str;

    /// Attempt to deliver the message exactly once
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), DeliveryError>;
}
