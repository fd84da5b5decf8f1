//! Telegram Bot API adapter for posting relayed items to a channel.
//!
//! Messages are sent with `sendMessage` using the HTML parse mode, so the
//! formatter's `<b>` and `<a>` tags are rendered by Telegram.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{DeliveryClient, DeliveryError};
use crate::domain::OutboundMessage;

/// Telegram Bot API client
pub struct TelegramClient {
    /// Bot token
    bot_token: String,
    /// Target channel (`@name` or numeric id)
    chat_id: String,
    /// HTTP client
    client: reqwest::Client,
}

/// Response from Telegram API
#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Message result from sendMessage
#[derive(Debug, Deserialize)]
struct MessageResult {
    message_id: i64,
}

/// The bot account, as returned by getMe
#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    pub username: Option<String>,
}

impl TelegramClient {
    /// Create a new Telegram client with a per-request timeout
    pub fn new(bot_token: String, chat_id: String, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            bot_token,
            chat_id,
            client,
        })
    }

    /// Build API URL
    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{}",
            self.bot_token, method
        )
    }

    /// Unwrap the Bot API envelope
    fn into_result<T>(response: TelegramResponse<T>) -> Result<Option<T>, DeliveryError> {
        if !response.ok {
            return Err(DeliveryError::Api(
                response
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(response.result)
    }

    /// Check the token by asking Telegram who we are
    pub async fn get_me(&self) -> Result<BotUser, DeliveryError> {
        let response = self.client.get(self.api_url("getMe")).send().await?;
        let body: TelegramResponse<BotUser> = response.json().await?;

        Self::into_result(body)?
            .ok_or_else(|| DeliveryError::Api("getMe returned no result".to_string()))
    }

    /// Send a text message to the configured channel
    pub async fn send_message(&self, message: &OutboundMessage) -> Result<i64, DeliveryError> {
        let url = self.api_url("sendMessage");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": self.chat_id,
                "text": message.text,
                "parse_mode": message.parse_mode.as_str(),
            }))
            .send()
            .await?;

        let body: TelegramResponse<MessageResult> = response.json().await?;

        Ok(Self::into_result(body)?.map(|r| r.message_id).unwrap_or(0))
    }
}

#[async_trait]
impl DeliveryClient for TelegramClient {
    fn destination(&self) -> &str {
        &self.chat_id
    }

    async fn deliver(&self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        let message_id = self.send_message(message).await?;
        tracing::debug!(message_id, chat_id = %self.chat_id, "Telegram accepted message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TelegramClient {
        TelegramClient::new("TOKEN".to_string(), "@channel".to_string(), Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn test_api_url() {
        assert_eq!(
            client().api_url("sendMessage"),
            "https://api.telegram.org/botTOKEN/sendMessage"
        );
    }

    #[test]
    fn test_destination_is_chat_id() {
        assert_eq!(client().destination(), "@channel");
    }

    #[test]
    fn test_api_error_surfaces_description() {
        let response: TelegramResponse<MessageResult> = serde_json::from_str(
            r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#,
        )
        .unwrap();

        match TelegramClient::into_result(response) {
            Err(DeliveryError::Api(msg)) => assert_eq!(msg, "Bad Request: chat not found"),
            other => panic!("expected Api error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_ok_response_yields_message_id() {
        let response: TelegramResponse<MessageResult> =
            serde_json::from_str(r#"{"ok":true,"result":{"message_id":42}}"#).unwrap();

        let result = TelegramClient::into_result(response).unwrap();
        assert_eq!(result.map(|r| r.message_id), Some(42));
    }
}
