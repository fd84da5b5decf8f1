//! Feed items as seen by the relay.

use serde::{Deserialize, Serialize};

/// A single item fetched from the feed.
///
/// Items are immutable and only live for one relay cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Item title (the default identity key)
    pub title: String,

    /// Item description, empty when the feed has none
    #[serde(default)]
    pub description: String,

    /// Link to the original post
    pub link: String,

    /// Feed-provided stable identifier (RSS `guid` / Atom `id`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
}

impl FeedItem {
    /// Create an item with a title and link and no description
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            link: link.into(),
            guid: None,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the feed-provided guid
    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        self.guid = Some(guid.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let item = FeedItem::new("Title", "https://example.com/1")
            .with_description("Body")
            .with_guid("urn:1");

        assert_eq!(item.title, "Title");
        assert_eq!(item.description, "Body");
        assert_eq!(item.link, "https://example.com/1");
        assert_eq!(item.guid.as_deref(), Some("urn:1"));
    }

    #[test]
    fn test_missing_description_deserializes_empty() {
        let item: FeedItem =
            serde_json::from_str(r#"{"title":"A","link":"u1"}"#).unwrap();
        assert!(item.description.is_empty());
        assert!(item.guid.is_none());
    }
}
