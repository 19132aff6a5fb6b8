//! Cache-aside wrapper with TTL policy by recency
//!
//! Historical days are immutable once written; the current day keeps
//! changing upstream, so its entry carries a bounded expiration and gets
//! re-scraped periodically. An empty computation is never stored: a source
//! that happened to return nothing must not poison a whole TTL window.

use std::future::Future;

use tracing::{debug, warn};

use crate::error::Result;
use crate::metrics;
use crate::model::NewsItem;
use crate::store::Keyspace;

pub struct NewsCache {
    store: Keyspace,
    today_ttl_secs: u64,
}

impl NewsCache {
    pub fn new(store: Keyspace, today_ttl_secs: u64) -> Self {
        Self {
            store,
            today_ttl_secs,
        }
    }

    /// Returns the cached value for `key`, or computes, stores and returns it.
    ///
    /// Store failures (read or write) and corrupt payloads are logged and
    /// treated as misses; the freshly computed result is always returned to
    /// the caller.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        is_current_period: bool,
        compute: F,
    ) -> Result<Vec<NewsItem>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<NewsItem>>>,
    {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<NewsItem>>(&raw) {
                Ok(items) => {
                    debug!(keyspace = self.store.prefix(), key, count = items.len(), "Cache hit");
                    metrics::record_cache_hit(self.store.prefix());
                    return Ok(items);
                }
                Err(e) => {
                    warn!(keyspace = self.store.prefix(), key, error = %e, "Corrupt cache entry, recomputing");
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(keyspace = self.store.prefix(), key, error = %e, "Cache read failed, recomputing");
            }
        }

        metrics::record_cache_miss(self.store.prefix());
        let items = compute().await?;

        if !items.is_empty() {
            let ttl = is_current_period.then_some(self.today_ttl_secs);
            match serde_json::to_string(&items) {
                Ok(json) => {
                    if let Err(e) = self.store.put(key, &json, ttl).await {
                        warn!(keyspace = self.store.prefix(), key, error = %e, "Cache write failed");
                    }
                }
                Err(e) => {
                    warn!(key, error = %e, "Failed to serialize items for cache");
                }
            }
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KvStore, MemoryStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn cache_over(store: Arc<MemoryStore>, ttl: u64) -> NewsCache {
        NewsCache::new(Keyspace::new(store, "daily"), ttl)
    }

    fn sample(n: usize) -> Vec<NewsItem> {
        (0..n)
            .map(|i| {
                NewsItem::new(
                    format!("title-{i}"),
                    "",
                    "domestic",
                    format!("https://example.com/{i}"),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_historical_key_computes_once() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_over(store.clone(), 1800);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let items = cache
                .get_or_compute("20240101", false, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(sample(2))
                })
                .await
                .unwrap();
            assert_eq!(items, sample(2));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_historical_entry_has_no_ttl() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_over(store.clone(), 0);

        cache
            .get_or_compute("20240101", false, || async { Ok(sample(1)) })
            .await
            .unwrap();

        // Even with a zero "today" TTL the historical entry persists
        assert_eq!(store.len(), 1);
        let raw = store.get("daily:20240101").await.unwrap().unwrap();
        let parsed: Vec<NewsItem> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, sample(1));
    }

    #[tokio::test]
    async fn test_current_period_entry_expires_and_recomputes() {
        let store = Arc::new(MemoryStore::new());
        // Zero TTL: the entry expires immediately, modelling an elapsed window
        let cache = cache_over(store.clone(), 0);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            cache
                .get_or_compute("20240601", true, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(sample(1))
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_result_is_never_stored() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_over(store.clone(), 1800);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let items = cache
                .get_or_compute("20240101", false, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![])
                })
                .await
                .unwrap();
            assert!(items.is_empty());
        }

        // The empty round was not cached, so the second call recomputed
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_entry_recomputes() {
        let store = Arc::new(MemoryStore::new());
        store.put("daily:20240101", "not json", None).await.unwrap();
        let cache = cache_over(store.clone(), 1800);

        let items = cache
            .get_or_compute("20240101", false, || async { Ok(sample(3)) })
            .await
            .unwrap();

        assert_eq!(items.len(), 3);
        // Recomputed value replaced the corrupt one
        let raw = store.get("daily:20240101").await.unwrap().unwrap();
        assert!(serde_json::from_str::<Vec<NewsItem>>(&raw).is_ok());
    }
}
