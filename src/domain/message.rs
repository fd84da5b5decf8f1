//! Outbound messages produced by the formatter.

use serde::{Deserialize, Serialize};

/// Markup dialect the destination renders the message text with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    /// Telegram's HTML subset (`<b>`, `<a>`, ...)
    #[serde(rename = "HTML")]
    Html,
}

impl ParseMode {
    /// Value sent in the `parse_mode` field of the Bot API
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMode::Html => "HTML",
        }
    }
}

/// A formatted message ready for delivery.
///
/// Constructed and dropped within a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Rendered message text
    pub text: String,

    /// How the destination should interpret `text`
    pub parse_mode: ParseMode,
}

impl OutboundMessage {
    /// Create an HTML message
    pub fn html(text: String) -> Self {
        Self {
            text,
            parse_mode: ParseMode::Html,
        }
    }
}
