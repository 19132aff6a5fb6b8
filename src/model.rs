//! Normalized news record
//!
//! Every source adapter produces the same record shape so that cached
//! payloads and HTTP responses are interchangeable across sources.

use serde::{Deserialize, Serialize};

/// A single normalized news entry.
///
/// `link` is the natural identifier within one source and date. `detail` may
/// be empty or a failure sentinel when enrichment did not succeed; that is
/// not an error condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub detail: String,
    pub category: String,
    pub link: String,
}

impl NewsItem {
    pub fn new(
        title: impl Into<String>,
        detail: impl Into<String>,
        category: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            detail: detail.into(),
            category: category.into(),
            link: link.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip() {
        let items = vec![
            NewsItem::new("Rate decision", "The central bank...", "business", "https://example.com/a"),
            NewsItem::new("Quake update", "", "domestic", "https://example.com/b"),
        ];

        let json = serde_json::to_string(&items).unwrap();
        let parsed: Vec<NewsItem> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, items);
    }

    #[test]
    fn test_field_order_irrelevant() {
        let json = r#"{
            "link": "https://example.com/x",
            "category": "it",
            "detail": "body text",
            "title": "Title"
        }"#;

        let item: NewsItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.title, "Title");
        assert_eq!(item.link, "https://example.com/x");
    }
}
