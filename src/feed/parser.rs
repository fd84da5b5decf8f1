//! Streaming RSS 2.0 / RSS 1.0 / Atom parser built on quick-xml.
//!
//! Only the fields the relay needs are extracted. Element names are matched
//! on their local part, so `content:encoded` and `atom:link` are handled
//! without namespace resolution.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::FeedError;
use crate::domain::FeedItem;

/// Parse a feed document from raw XML bytes, preserving item order
pub fn parse_feed(xml: &[u8]) -> Result<Vec<FeedItem>, FeedError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut buf = Vec::new();

    let mut saw_root = false;
    let mut depth = 0usize;

    let mut current_item: Option<(usize, ItemBuilder)> = None;
    let mut active: Option<(usize, Field)> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                let local = e.local_name();
                let local = local.as_ref();

                if depth == 1 && matches!(local, b"rss" | b"feed" | b"RDF") {
                    saw_root = true;
                }

                if is_item_tag(local) && current_item.is_none() {
                    current_item = Some((depth, ItemBuilder::default()));
                } else if let Some((_, ref mut item)) = current_item {
                    if local == b"link" {
                        item.link_from_attributes(&e)?;
                    }
                    if active.is_none() {
                        if let Some(field) = Field::from_local_name(local) {
                            active = Some((depth, field));
                            text.clear();
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some((_, ref mut item)) = current_item {
                    if e.local_name().as_ref() == b"link" {
                        item.link_from_attributes(&e)?;
                    }
                }
            }
            Ok(Event::End(e)) => {
                if let Some((field_depth, field)) = active {
                    if field_depth == depth {
                        if let Some((_, ref mut item)) = current_item {
                            item.set(field, text.trim());
                        }
                        active = None;
                        text.clear();
                    }
                }

                let closes_item = matches!(current_item, Some((item_depth, _)) if item_depth == depth);
                if closes_item && is_item_tag(e.local_name().as_ref()) {
                    if let Some((_, builder)) = current_item.take() {
                        if let Some(item) = builder.build() {
                            items.push(item);
                        }
                    }
                }

                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(e)) => {
                if active.is_some() {
                    let unescaped = e
                        .unescape_with(resolve_html_entity)
                        .map_err(|e| FeedError::Parse(format!("Invalid text content: {}", e)))?;
                    text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(e)) => {
                if active.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FeedError::Parse(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(FeedError::Parse(
            "Document is not an RSS or Atom feed".to_string(),
        ));
    }

    Ok(items)
}

fn is_item_tag(local: &[u8]) -> bool {
    matches!(local, b"item" | b"entry")
}

/// Entities commonly leaked into feeds by HTML-generating bridges
fn resolve_html_entity(entity: &str) -> Option<&'static str> {
    match entity {
        "nbsp" => Some("\u{a0}"),
        "hellip" => Some("\u{2026}"),
        "mdash" => Some("\u{2014}"),
        "ndash" => Some("\u{2013}"),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Description,
    Summary,
    Content,
    Link,
    Guid,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"description" => Some(Field::Description),
            b"summary" => Some(Field::Summary),
            b"content" | b"encoded" => Some(Field::Content),
            b"link" => Some(Field::Link),
            b"guid" | b"id" => Some(Field::Guid),
            _ => None,
        }
    }
}

#[derive(Default)]
struct ItemBuilder {
    title: Option<String>,
    description: Option<String>,
    summary: Option<String>,
    content: Option<String>,
    link: Option<String>,
    guid: Option<String>,
}

impl ItemBuilder {
    /// Record a field value; the first non-empty occurrence wins
    fn set(&mut self, field: Field, value: &str) {
        if value.is_empty() {
            return;
        }

        let slot = match field {
            Field::Title => &mut self.title,
            Field::Description => &mut self.description,
            Field::Summary => &mut self.summary,
            Field::Content => &mut self.content,
            Field::Link => &mut self.link,
            Field::Guid => &mut self.guid,
        };

        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }

    /// Atom-style `<link rel="alternate" href="..."/>`
    fn link_from_attributes(&mut self, e: &BytesStart<'_>) -> Result<(), FeedError> {
        let mut href = None;
        let mut rel = None;

        for attr in e.attributes().flatten() {
            let value = attr
                .unescape_value()
                .map_err(|e| FeedError::Parse(format!("Invalid link attribute: {}", e)))?
                .to_string();
            match attr.key.local_name().as_ref() {
                b"href" => href = Some(value),
                b"rel" => rel = Some(value),
                _ => {}
            }
        }

        if let Some(href) = href {
            if rel.as_deref().map_or(true, |r| r == "alternate") {
                self.set(Field::Link, href.trim());
            }
        }

        Ok(())
    }

    fn build(self) -> Option<FeedItem> {
        if self.title.is_none() && self.link.is_none() {
            return None;
        }

        Some(FeedItem {
            title: self.title.unwrap_or_default(),
            description: self
                .description
                .or(self.summary)
                .or(self.content)
                .unwrap_or_default(),
            link: self.link.unwrap_or_default(),
            guid: self.guid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>Bridge</title>
    <link>https://bridge.example</link>
    <item>
      <title>First post</title>
      <description><![CDATA[<i>hello</i> world]]></description>
      <link>https://example.com/1</link>
      <guid isPermaLink="false">post-1</guid>
    </item>
    <item>
      <title>Tom &amp; Jerry</title>
      <link>https://example.com/2</link>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example</title>
  <entry>
    <title>Atom entry</title>
    <link rel="self" href="https://example.com/self"/>
    <link rel="alternate" href="https://example.com/a"/>
    <id>urn:uuid:1</id>
    <summary>Short summary</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_items_in_order() {
        let items = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].title, "First post");
        assert_eq!(items[0].description, "<i>hello</i> world");
        assert_eq!(items[0].link, "https://example.com/1");
        assert_eq!(items[0].guid.as_deref(), Some("post-1"));

        assert_eq!(items[1].title, "Tom & Jerry");
        assert!(items[1].description.is_empty());
        assert!(items[1].guid.is_none());
    }

    #[test]
    fn test_channel_fields_are_not_items() {
        let items = parse_feed(RSS.as_bytes()).unwrap();
        assert!(items.iter().all(|i| i.title != "Bridge"));
    }

    #[test]
    fn test_parse_atom_entry() {
        let items = parse_feed(ATOM.as_bytes()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Atom entry");
        assert_eq!(items[0].link, "https://example.com/a");
        assert_eq!(items[0].description, "Short summary");
        assert_eq!(items[0].guid.as_deref(), Some("urn:uuid:1"));
    }

    #[test]
    fn test_html_page_is_rejected() {
        let err = parse_feed(b"<html><body>502 Bad Gateway</body></html>").unwrap_err();
        assert!(matches!(err, FeedError::Parse(_)));
    }

    #[test]
    fn test_mismatched_tags_are_rejected() {
        let xml = b"<rss><channel><item><title>A</item></channel></rss>";
        assert!(parse_feed(xml).is_err());
    }

    #[test]
    fn test_empty_channel() {
        let xml = b"<rss version=\"2.0\"><channel><title>x</title></channel></rss>";
        assert!(parse_feed(xml).unwrap().is_empty());
    }
}
