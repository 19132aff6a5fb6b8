//! newsgate
//! Date-partitioned news aggregation cache over scraped topic listings and
//! RSS feeds.
//!
//! Features:
//! - Per-source fetch-and-normalize adapters (topic-listing scraper, RSS feeds)
//! - Cache-aside layer with TTL policy by recency (historical days immutable,
//!   today expires and re-scrapes)
//! - Permanent per-article detail cache keyed by link
//! - Fork-join aggregation with per-source failure tolerance
//! - HTTP boundary with path dispatch, CORS and Prometheus metrics
//! - Semaphore-limited HTTP client with retries and per-source rate limiting

pub mod aggregator;
pub mod cache;
pub mod clock;
pub mod config;
pub mod enrich;
pub mod error;
pub mod http_client;
pub mod metrics;
pub mod model;
pub mod registry;
pub mod server;
pub mod sources;
pub mod store;
