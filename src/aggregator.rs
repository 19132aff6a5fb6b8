//! Topic aggregation
//!
//! Fans out one fetch per configured category, then one detail fetch per
//! listing entry, and flattens the groups in configured category order.
//! The whole "categories x date -> items" computation sits behind the
//! aggregation cache keyed by the date.

use futures::future;
use tracing::warn;

use crate::cache::NewsCache;
use crate::clock;
use crate::enrich::DetailEnricher;
use crate::error::{NewsError, Result};
use crate::metrics;
use crate::model::NewsItem;
use crate::sources::topics::TopicSource;

pub struct TopicAggregator {
    categories: Vec<String>,
    source: TopicSource,
    enricher: DetailEnricher,
    cache: NewsCache,
}

impl TopicAggregator {
    pub fn new(
        categories: Vec<String>,
        source: TopicSource,
        enricher: DetailEnricher,
        cache: NewsCache,
    ) -> Self {
        Self {
            categories,
            source,
            enricher,
            cache,
        }
    }

    /// Aggregated news for today's JST date.
    pub async fn for_today(&self) -> Result<Vec<NewsItem>> {
        self.for_date(&clock::today()).await
    }

    /// Aggregated news for an 8-digit date key.
    pub async fn for_date(&self, date: &str) -> Result<Vec<NewsItem>> {
        if !clock::is_valid_date_key(date) {
            return Err(NewsError::InvalidDateKey(date.to_string()));
        }

        let is_current = clock::is_current_period(date);
        self.cache
            .get_or_compute(date, is_current, || self.collect(date))
            .await
    }

    /// Fetches all categories concurrently and flattens the groups.
    ///
    /// Category groups keep configured order; items within a category keep
    /// source order. No cross-category sort is imposed.
    async fn collect(&self, date: &str) -> Result<Vec<NewsItem>> {
        let groups = future::join_all(
            self.categories
                .iter()
                .map(|category| self.collect_category(category, date)),
        )
        .await;

        Ok(groups.into_iter().flatten().collect())
    }

    /// One category's items with enriched details; failures yield an empty
    /// group so the remaining categories still aggregate.
    async fn collect_category(&self, category: &str, date: &str) -> Vec<NewsItem> {
        let entries = match self.source.fetch_listing(category, date).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(category, date, error = %e, "Category fetch failed, skipping");
                metrics::record_fetch_error("topics");
                return vec![];
            }
        };

        future::join_all(entries.into_iter().map(|entry| async move {
            let detail = self.enricher.detail(&entry.link).await;
            NewsItem {
                title: entry.title,
                detail,
                category: category.to_string(),
                link: entry.link,
            }
        }))
        .await
    }
}
