//! Source adapters
//!
//! Each origin (topic-listing pages, RSS feeds) normalizes its documents
//! into [`NewsItem`] records. A transient fetch or parse failure in one
//! source yields an empty result for that source; it never aborts the
//! enclosing aggregation.

pub mod feed;
pub mod topics;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::NewsItem;

/// Metadata about a source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Route token used for dispatch
    pub path: String,
    /// Human-readable name
    pub name: String,
    /// Description
    pub description: String,
}

/// A listing entry before enrichment: just the link/title pair pulled from
/// markup. `detail` and `category` are attached by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub title: String,
    pub link: String,
}

/// Per-item inclusion predicate, applied after extraction and normalization.
pub type ItemFilter = Arc<dyn Fn(&NewsItem) -> bool + Send + Sync>;

/// Predicate accepting every item
pub fn accept_all() -> ItemFilter {
    Arc::new(|_| true)
}

/// A named, zero-argument news producer, dispatchable from the registry.
#[async_trait]
pub trait NewsHandler: Send + Sync {
    /// Gets metadata about this source
    fn metadata(&self) -> &SourceMetadata;

    /// Produces the current sequence of news items
    async fn news(&self) -> Result<Vec<NewsItem>>;

    /// Gets the route token
    fn path(&self) -> &str {
        &self.metadata().path
    }

    /// Gets the source name
    fn name(&self) -> &str {
        &self.metadata().name
    }
}

pub use feed::FeedSource;
pub use topics::TopicSource;
