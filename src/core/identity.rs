//! Item identity: the key used to decide whether an item was already sent.
//!
//! Keys are normalized with [`normalize`] before they are compared or
//! recorded, so every [`Identity`] only needs to pick the raw value.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::FeedItem;

/// Derives the raw identity key of a feed item
pub trait Identity: Send + Sync {
    /// Short name used in logs and config
    fn name(&self) -> &'static str;

    /// Raw (un-normalized) key for the item
    fn key(&self, item: &FeedItem) -> String;
}

/// Identify items by title. Two items sharing a title collide.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleIdentity;

impl Identity for TitleIdentity {
    fn name(&self) -> &'static str {
        "title"
    }

    fn key(&self, item: &FeedItem) -> String {
        item.title.clone()
    }
}

/// Identify items by link
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkIdentity;

impl Identity for LinkIdentity {
    fn name(&self) -> &'static str {
        "link"
    }

    fn key(&self, item: &FeedItem) -> String {
        item.link.clone()
    }
}

/// Identify items by feed-provided guid, falling back to link, then title
#[derive(Debug, Clone, Copy, Default)]
pub struct GuidIdentity;

impl Identity for GuidIdentity {
    fn name(&self) -> &'static str {
        "guid"
    }

    fn key(&self, item: &FeedItem) -> String {
        [item.guid.as_deref(), Some(item.link.as_str())]
            .into_iter()
            .flatten()
            .find(|k| !k.trim().is_empty())
            .unwrap_or(item.title.as_str())
            .to_string()
    }
}

/// Config-selectable identity strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    #[default]
    Title,
    Link,
    Guid,
}

impl IdentityKind {
    /// Build the identity function for this kind
    pub fn build(self) -> Box<dyn Identity> {
        match self {
            IdentityKind::Title => Box::new(TitleIdentity),
            IdentityKind::Link => Box::new(LinkIdentity),
            IdentityKind::Guid => Box::new(GuidIdentity),
        }
    }
}

impl FromStr for IdentityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(IdentityKind::Title),
            "link" => Ok(IdentityKind::Link),
            "guid" => Ok(IdentityKind::Guid),
            other => Err(format!(
                "unknown identity '{}', expected one of: title, link, guid",
                other
            )),
        }
    }
}

impl std::fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.build().name())
    }
}

/// Normalize a raw key for comparison and storage.
///
/// Line breaks become spaces (the state file is line-oriented), then
/// surrounding whitespace is trimmed. No case folding.
pub fn normalize(raw: &str) -> String {
    let flattened: String = raw
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    flattened.trim().to_string()
}
