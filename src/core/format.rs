//! Feed item to Telegram HTML message.
//!
//! Content is passed through unescaped: a title containing `<` or `&` can
//! break rendering on the destination side.

use crate::domain::{FeedItem, OutboundMessage};

/// Text of the trailing link line
pub const READ_MORE: &str = "Read More";

/// Format an item as bold title, optional description, and a link line
pub fn format_item(item: &FeedItem) -> OutboundMessage {
    let mut text = format!("<b>{}</b>\n", item.title);

    if !item.description.is_empty() {
        text.push_str(&item.description);
        text.push('\n');
    }

    text.push_str(&format!("<a href=\"{}\">{}</a>", item.link, READ_MORE));

    OutboundMessage::html(text)
}
