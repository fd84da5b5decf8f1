//! Formatter Integration Tests

use feedrelay::core::format_item;
use feedrelay::domain::{FeedItem, ParseMode};

#[test]
fn test_formatting_is_deterministic() {
    let item = FeedItem::new("Title", "https://example.com/p/1").with_description("Line");

    let first = format_item(&item);
    let second = format_item(&item);

    assert_eq!(first.text.as_bytes(), second.text.as_bytes());
    assert_eq!(first.parse_mode, ParseMode::Html);
}

#[test]
fn test_no_blank_line_without_description() {
    let text = format_item(&FeedItem::new("Title", "u")).text;

    assert_eq!(text.lines().count(), 2);
    assert!(!text.contains("\n\n"));
    assert!(!text.ends_with('\n'));
}

#[test]
fn test_line_layout() {
    let item = FeedItem::new("Title", "u").with_description("Desc");
    let text = format_item(&item).text;
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines, vec!["<b>Title</b>", "Desc", "<a href=\"u\">Read More</a>"]);
}
