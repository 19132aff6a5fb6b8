//! Source registry
//!
//! Static ordered list of named feed handlers, built once at startup and
//! read-only thereafter. The boundary layer uses it for discovery
//! (`/resources`) and path dispatch.

use std::sync::Arc;

use serde::Serialize;

use crate::cache::NewsCache;
use crate::config::Config;
use crate::http_client::{ResilientHttpClient, SourceHttpClient};
use crate::sources::feed::{link_date_filter, FeedSource};
use crate::sources::NewsHandler;
use crate::store::{Keyspace, KvStore};

/// Discovery record exposed at the boundary
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResourceInfo {
    pub path: String,
    pub name: String,
}

pub struct Registry {
    entries: Vec<Arc<dyn NewsHandler>>,
}

impl Registry {
    pub fn new(entries: Vec<Arc<dyn NewsHandler>>) -> Self {
        Self { entries }
    }

    /// Registered sources in registration order.
    pub fn resources(&self) -> Vec<ResourceInfo> {
        self.entries
            .iter()
            .map(|handler| ResourceInfo {
                path: handler.path().to_string(),
                name: handler.name().to_string(),
            })
            .collect()
    }

    /// Resolves a route token to its handler.
    pub fn find(&self, path: &str) -> Option<&Arc<dyn NewsHandler>> {
        self.entries.iter().find(|handler| handler.path() == path)
    }
}

/// Builds the production registry: NHK (today-filtered, cached per day) plus
/// the uncached straight-through feeds.
pub fn default_registry(
    http_client: Arc<ResilientHttpClient>,
    store: Arc<dyn KvStore>,
    config: &Config,
) -> Registry {
    let feed_client =
        |path: &str| SourceHttpClient::new(http_client.clone(), path, config.feed_rate_limit_rpm);

    let nhk_urls = vec![
        "https://www.nhk.or.jp/rss/news/cat1.xml".to_string(), // society
        "https://www.nhk.or.jp/rss/news/cat3.xml".to_string(), // science & medicine
        "https://www.nhk.or.jp/rss/news/cat4.xml".to_string(), // politics
        "https://www.nhk.or.jp/rss/news/cat5.xml".to_string(), // economy
        "https://www.nhk.or.jp/rss/news/cat6.xml".to_string(), // international
    ];
    let nhk_cache = NewsCache::new(Keyspace::new(store, "feed:nhk"), config.today_ttl_secs);
    let nhk = FeedSource::new(feed_client("nhk"), "nhk", "NHK", nhk_urls)
        .with_filter(link_date_filter())
        .with_cache(nhk_cache);

    let plain = |path: &str, name: &str, url: &str| {
        Arc::new(FeedSource::new(
            feed_client(path),
            path,
            name,
            vec![url.to_string()],
        )) as Arc<dyn NewsHandler>
    };

    Registry::new(vec![
        Arc::new(nhk),
        plain("monoist", "MONOist", "https://rss.itmedia.co.jp/rss/2.0/monoist.xml"),
        plain("itmediaai", "ITmedia AI+", "https://rss.itmedia.co.jp/rss/2.0/aiplus.xml"),
        plain("itmedianews", "ITmedia News", "https://rss.itmedia.co.jp/rss/2.0/news_bursts.xml"),
        plain("zenn", "Zenn", "https://zenn.dev/feed"),
        plain("gigazine", "GIGAZINE", "https://gigazine.net/news/rss_2.0/"),
        plain("nature", "Nature", "https://www.nature.com/nature.rss"),
    ])
}
