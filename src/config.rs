//! Configuration for the aggregation service

use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // HTTP boundary
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    // Key-value store
    pub redis_url: Option<String>,

    // Topic-listing source
    #[serde(default = "default_topics_base_url")]
    pub topics_base_url: String,
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    #[serde(default = "default_item_selector")]
    pub topics_item_selector: String,
    #[serde(default = "default_link_selector")]
    pub topics_link_selector: String,
    #[serde(default = "default_title_selector")]
    pub topics_title_selector: String,

    // Detail enrichment
    #[serde(default = "default_detail_selector")]
    pub detail_selector: String,

    // Cache policy
    #[serde(default = "default_today_ttl")]
    pub today_ttl_secs: u64,

    // HTTP client
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    // Rate limiting (requests per minute)
    #[serde(default = "default_scrape_rate_limit")]
    pub topics_rate_limit_rpm: u32,
    #[serde(default = "default_scrape_rate_limit")]
    pub detail_rate_limit_rpm: u32,
    #[serde(default = "default_feed_rate_limit")]
    pub feed_rate_limit_rpm: u32,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_topics_base_url() -> String {
    "https://news.yahoo.co.jp/topics".to_string()
}

fn default_categories() -> Vec<String> {
    ["domestic", "world", "business", "it", "science"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_item_selector() -> String {
    ".newsFeed_list li".to_string()
}

fn default_link_selector() -> String {
    "a".to_string()
}

fn default_title_selector() -> String {
    ".newsFeed_item_title".to_string()
}

fn default_detail_selector() -> String {
    "article .highLightSearchTarget".to_string()
}

fn default_today_ttl() -> u64 {
    1800 // today's listing keeps changing, re-scrape every 30 minutes
}

fn default_max_concurrent_requests() -> usize {
    10
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_scrape_rate_limit() -> u32 {
    120
}

fn default_feed_rate_limit() -> u32 {
    60
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file
        dotenvy::dotenv().ok();

        // Build config from environment
        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Checks if a Redis-backed store is configured
    pub fn has_redis(&self) -> bool {
        self.redis_url.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            redis_url: None,
            topics_base_url: default_topics_base_url(),
            categories: default_categories(),
            topics_item_selector: default_item_selector(),
            topics_link_selector: default_link_selector(),
            topics_title_selector: default_title_selector(),
            detail_selector: default_detail_selector(),
            today_ttl_secs: default_today_ttl(),
            max_concurrent_requests: default_max_concurrent_requests(),
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
            topics_rate_limit_rpm: default_scrape_rate_limit(),
            detail_rate_limit_rpm: default_scrape_rate_limit(),
            feed_rate_limit_rpm: default_feed_rate_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();

        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.today_ttl_secs, 1800);
        assert_eq!(config.categories.len(), 5);
        assert_eq!(config.categories[0], "domestic");
        assert!(!config.has_redis());
    }
}
