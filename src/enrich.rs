//! Article detail enrichment
//!
//! Fetches the long-form text snippet for one article link and caches it
//! permanently, keyed by the link. Published article bodies do not change,
//! so entries carry no TTL. A failed or empty fetch is never cached, which
//! keeps the link retryable on the next request.

use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::error::{NewsError, Result};
use crate::http_client::SourceHttpClient;
use crate::metrics;
use crate::store::Keyspace;

/// Sentinel returned when a detail page could not be fetched or parsed.
pub const DETAIL_FETCH_FAILED: &str = "failed to fetch article detail";

pub struct DetailEnricher {
    store: Keyspace,
    client: SourceHttpClient,
    /// CSS selector for the article body region
    content_selector: String,
}

impl DetailEnricher {
    pub fn new(store: Keyspace, client: SourceHttpClient, content_selector: impl Into<String>) -> Self {
        Self {
            store,
            client,
            content_selector: content_selector.into(),
        }
    }

    /// Returns the detail text for an article link.
    ///
    /// Never fails: any error degrades to the [`DETAIL_FETCH_FAILED`]
    /// sentinel. Safe to call concurrently for many distinct links; each
    /// link is an independent cache key.
    pub async fn detail(&self, link: &str) -> String {
        match self.store.get(link).await {
            Ok(Some(cached)) => {
                debug!(link, "Detail cache hit");
                return cached;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(link, error = %e, "Detail cache read failed, fetching");
            }
        }

        match self.fetch_detail(link).await {
            Ok(text) => {
                if !text.is_empty() {
                    if let Err(e) = self.store.put(link, &text, None).await {
                        warn!(link, error = %e, "Detail cache write failed");
                    }
                }
                text
            }
            Err(e) => {
                warn!(link, error = %e, "Failed to fetch article detail");
                metrics::record_fetch_error(self.client.source_id());
                DETAIL_FETCH_FAILED.to_string()
            }
        }
    }

    async fn fetch_detail(&self, link: &str) -> Result<String> {
        let body = self.client.get_text(link).await?;
        extract_text(&body, &self.content_selector)
    }
}

/// Extracts the joined text of all elements matching `selector`.
fn extract_text(body: &str, selector: &str) -> Result<String> {
    let selector = Selector::parse(selector)
        .map_err(|e| NewsError::ParseError(format!("bad detail selector: {e}")))?;
    let document = Html::parse_document(body);

    let text = document
        .select(&selector)
        .flat_map(|element| element.text())
        .collect::<Vec<_>>()
        .join("");

    Ok(text.trim().to_string())
}
