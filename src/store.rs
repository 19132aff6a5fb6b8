//! Key-value store capability
//!
//! The cache layers only need `get`/`put` with an optional expiration; no
//! listing, transactions or compare-and-swap. Redis backs the service in
//! production, an in-process map backs tests and one-shot CLI harvests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use tracing::info;

use crate::error::Result;

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Retrieves a value, `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores a value, expiring after `ttl_secs` when given, never otherwise.
    async fn put(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<()>;
}

/// Redis-backed store
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        info!("Connecting to Redis...");
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("Store initialized");
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl_secs {
            cmd.arg("EX").arg(ttl);
        }
        cmd.query_async::<()>(&mut conn).await?;
        Ok(())
    }
}

/// In-process store with lazy TTL expiry, for tests and Redis-less runs
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, Option<Instant>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|(_, deadline)| deadline.map_or(true, |d| d > now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((_, Some(deadline))) if *deadline <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<()> {
        let deadline = ttl_secs.map(|ttl| Instant::now() + Duration::from_secs(ttl));
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_string(), deadline));
        Ok(())
    }
}

/// Prefix wrapper giving each cache its own key namespace over a shared store.
///
/// The daily news cache, per-feed caches and the article detail cache must
/// never collide even when they key by similar-looking strings.
#[derive(Clone)]
pub struct Keyspace {
    store: Arc<dyn KvStore>,
    prefix: String,
}

impl Keyspace {
    pub fn new(store: Arc<dyn KvStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn qualified(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        self.store.get(&self.qualified(key)).await
    }

    pub async fn put(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<()> {
        self.store.put(&self.qualified(key), value, ttl_secs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.put("k", "v", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_ttl_expiry() {
        let store = MemoryStore::new();
        store.put("gone", "v", Some(0)).await.unwrap();

        // Zero TTL expires immediately
        assert_eq!(store.get("gone").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_keyspaces_do_not_collide() {
        let store = Arc::new(MemoryStore::new());
        let daily = Keyspace::new(store.clone(), "daily");
        let detail = Keyspace::new(store.clone(), "detail");

        daily.put("20240101", "news", None).await.unwrap();
        detail.put("20240101", "text", None).await.unwrap();

        assert_eq!(daily.get("20240101").await.unwrap().as_deref(), Some("news"));
        assert_eq!(detail.get("20240101").await.unwrap().as_deref(), Some("text"));
        assert_eq!(store.len(), 2);
    }
}
