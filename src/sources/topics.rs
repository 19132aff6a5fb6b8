//! Topic-listing scraper
//!
//! Fetches the listing page for one (category, date) pair and extracts
//! link/title pairs from its markup. The structural selectors are
//! configuration, not code: the page layout is an external concern and the
//! extraction is just "document in, entries out".

use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use super::RawEntry;
use crate::error::{NewsError, Result};
use crate::http_client::SourceHttpClient;

/// CSS selectors locating list entries and their link/title nodes
#[derive(Debug, Clone)]
pub struct TopicSelectors {
    /// Selects one element per listing entry
    pub item: String,
    /// Selects the anchor within an entry
    pub link: String,
    /// Selects the title node within the anchor; anchor text is the fallback
    pub title: String,
}

pub struct TopicSource {
    client: SourceHttpClient,
    base_url: String,
    selectors: TopicSelectors,
}

impl TopicSource {
    pub fn new(client: SourceHttpClient, base_url: impl Into<String>, selectors: TopicSelectors) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            selectors,
        }
    }

    /// Listing URL for a category and date key, `{base}/{category}?date={date}`
    pub fn listing_url(&self, category: &str, date: &str) -> String {
        format!("{}/{}?date={}", self.base_url, category, date)
    }

    /// Fetches and extracts the listing for one category and date.
    pub async fn fetch_listing(&self, category: &str, date: &str) -> Result<Vec<RawEntry>> {
        let url = self.listing_url(category, date);
        debug!(source = self.client.source_id(), category, date, "Fetching topic listing");

        let body = self.client.get_text(&url).await?;
        let entries = extract_entries(&body, &self.selectors, &url)?;

        info!(
            source = self.client.source_id(),
            category,
            date,
            count = entries.len(),
            "Extracted topic listing"
        );
        Ok(entries)
    }
}

/// Extracts link/title pairs from a listing document.
///
/// Relative hrefs are resolved against the page URL. Entries without an
/// anchor or href are skipped.
fn extract_entries(body: &str, selectors: &TopicSelectors, page_url: &str) -> Result<Vec<RawEntry>> {
    let item_sel = parse_selector(&selectors.item)?;
    let link_sel = parse_selector(&selectors.link)?;
    let title_sel = parse_selector(&selectors.title)?;
    let base = Url::parse(page_url).map_err(|e| NewsError::ParseError(e.to_string()))?;

    let document = Html::parse_document(body);
    let mut entries = Vec::new();

    for item in document.select(&item_sel) {
        let Some(anchor) = item.select(&link_sel).next() else {
            continue;
        };
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(link) = base.join(href) else {
            continue;
        };

        let title = anchor
            .select(&title_sel)
            .next()
            .map(|node| node.text().collect::<String>())
            .unwrap_or_else(|| anchor.text().collect::<String>())
            .trim()
            .to_string();

        entries.push(RawEntry {
            title,
            link: link.to_string(),
        });
    }

    Ok(entries)
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| NewsError::ParseError(format!("bad selector `{selector}`: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selectors() -> TopicSelectors {
        TopicSelectors {
            item: ".newsFeed_list li".to_string(),
            link: "a".to_string(),
            title: ".newsFeed_item_title".to_string(),
        }
    }

    const LISTING: &str = r#"
        <html><body>
          <ul class="newsFeed_list">
            <li>
              <a href="https://news.example.com/pickup/1">
                <div><div class="newsFeed_item_title">First headline</div></div>
              </a>
            </li>
            <li>
              <a href="/pickup/2"><span>Bare anchor title</span></a>
            </li>
            <li><span>no anchor, skipped</span></li>
          </ul>
        </body></html>
    "#;

    #[test]
    fn test_extract_entries() {
        let entries =
            extract_entries(LISTING, &selectors(), "https://news.example.com/topics/it?date=20240101")
                .unwrap();

        assert_eq!(
            entries,
            vec![
                RawEntry {
                    title: "First headline".to_string(),
                    link: "https://news.example.com/pickup/1".to_string(),
                },
                RawEntry {
                    title: "Bare anchor title".to_string(),
                    link: "https://news.example.com/pickup/2".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_extract_entries_empty_document() {
        let entries = extract_entries("<html></html>", &selectors(), "https://news.example.com/")
            .unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_bad_selector_is_an_error() {
        let mut sel = selectors();
        sel.item = ":::".to_string();
        assert!(extract_entries(LISTING, &sel, "https://news.example.com/").is_err());
    }
}
