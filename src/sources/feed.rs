//! RSS feed adapter
//!
//! One adapter instance covers one named source, which may span several feed
//! URLs (e.g. one per category). Feeds already carry content, so items are
//! normalized directly without detail enrichment. A per-item inclusion
//! filter runs after normalization; the NHK-style variant keeps only items
//! whose link encodes today's date.

use async_trait::async_trait;
use futures::future;
use tracing::{info, warn};

use super::{accept_all, ItemFilter, NewsHandler, SourceMetadata};
use crate::cache::NewsCache;
use crate::clock;
use crate::error::{NewsError, Result};
use crate::http_client::SourceHttpClient;
use crate::metrics;
use crate::model::NewsItem;

pub struct FeedSource {
    metadata: SourceMetadata,
    client: SourceHttpClient,
    urls: Vec<String>,
    filter: ItemFilter,
    /// When set, results are cached under today's date key
    cache: Option<NewsCache>,
}

impl FeedSource {
    pub fn new(
        client: SourceHttpClient,
        path: impl Into<String>,
        name: impl Into<String>,
        urls: Vec<String>,
    ) -> Self {
        let path = path.into();
        let name = name.into();
        let metadata = SourceMetadata {
            path: path.clone(),
            name: name.clone(),
            description: format!("{name} RSS feed"),
        };

        Self {
            metadata,
            client,
            urls,
            filter: accept_all(),
            cache: None,
        }
    }

    pub fn with_filter(mut self, filter: ItemFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_cache(mut self, cache: NewsCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Fetches all feed URLs concurrently, flattening in configured order.
    async fn collect(&self) -> Result<Vec<NewsItem>> {
        let groups = future::join_all(self.urls.iter().map(|url| self.fetch_feed(url))).await;
        let items: Vec<NewsItem> = groups.into_iter().flatten().collect();

        info!(
            source = %self.metadata.path,
            feeds = self.urls.len(),
            count = items.len(),
            "Collected feed items"
        );
        Ok(items)
    }

    /// Fetches one feed URL; failures degrade to an empty list.
    async fn fetch_feed(&self, url: &str) -> Vec<NewsItem> {
        match self.try_fetch_feed(url).await {
            Ok(items) => items,
            Err(e) => {
                warn!(source = %self.metadata.path, url, error = %e, "Feed fetch failed");
                metrics::record_fetch_error(&self.metadata.path);
                vec![]
            }
        }
    }

    async fn try_fetch_feed(&self, url: &str) -> Result<Vec<NewsItem>> {
        let bytes = self.client.get_bytes(url).await?;
        let channel = rss::Channel::read_from(&bytes[..])
            .map_err(|e| NewsError::ParseError(format!("failed to parse feed {url}: {e}")))?;

        Ok(parse_channel(&channel)
            .into_iter()
            .filter(|item| (self.filter)(item))
            .collect())
    }
}

#[async_trait]
impl NewsHandler for FeedSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    async fn news(&self) -> Result<Vec<NewsItem>> {
        match &self.cache {
            Some(cache) => {
                let key = clock::today();
                cache.get_or_compute(&key, true, || self.collect()).await
            }
            None => self.collect().await,
        }
    }
}

/// Normalizes a parsed channel into news items, preserving feed order.
fn parse_channel(channel: &rss::Channel) -> Vec<NewsItem> {
    channel
        .items()
        .iter()
        .filter_map(|item| {
            let title = item.title()?.to_string();
            let link = item.link()?.to_string();
            let detail = item
                .content()
                .or_else(|| item.description())
                .unwrap_or_default()
                .to_string();
            let category = item
                .categories()
                .iter()
                .map(|c| c.name())
                .collect::<Vec<_>>()
                .join(",");

            Some(NewsItem {
                title,
                detail,
                category,
                link,
            })
        })
        .collect()
}

/// Filter keeping only items whose link encodes today's JST date.
///
/// NHK article links carry the publication date as a path segment:
/// `https://www3.nhk.or.jp/news/html/20250207/k10014716431000.html`.
pub fn link_date_filter() -> ItemFilter {
    link_date_filter_for(clock::today())
}

fn link_date_filter_for(date: String) -> ItemFilter {
    std::sync::Arc::new(move |item: &NewsItem| match item.link.split('/').nth(5) {
        Some(segment) => segment == date,
        None => {
            warn!(link = %item.link, "Item link has no date segment");
            false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <rss version="2.0">
          <channel>
            <title>Example Feed</title>
            <link>https://feed.example.com/</link>
            <description>test</description>
            <item>
              <title>Feed item one</title>
              <link>https://feed.example.com/articles/1</link>
              <description>Summary one</description>
              <category>tech</category>
              <category>ai</category>
            </item>
            <item>
              <title>Feed item two</title>
              <link>https://feed.example.com/articles/2</link>
              <description>Summary two</description>
            </item>
            <item>
              <description>No title or link, skipped</description>
            </item>
          </channel>
        </rss>
    "#;

    #[test]
    fn test_parse_channel() {
        let channel = rss::Channel::read_from(FEED.as_bytes()).unwrap();
        let items = parse_channel(&channel);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Feed item one");
        assert_eq!(items[0].detail, "Summary one");
        assert_eq!(items[0].category, "tech,ai");
        assert_eq!(items[0].link, "https://feed.example.com/articles/1");
        assert_eq!(items[1].category, "");
    }

    #[test]
    fn test_link_date_filter() {
        let filter = link_date_filter_for("20250207".to_string());

        let today = NewsItem::new(
            "t",
            "",
            "",
            "https://www3.nhk.or.jp/news/html/20250207/k10014716431000.html",
        );
        let yesterday = NewsItem::new(
            "t",
            "",
            "",
            "https://www3.nhk.or.jp/news/html/20250206/k10014716431000.html",
        );
        let malformed = NewsItem::new("t", "", "", "nonsense");

        assert!(filter(&today));
        assert!(!filter(&yesterday));
        assert!(!filter(&malformed));
    }
}
