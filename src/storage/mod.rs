//! Storage abstractions for caches, provider health and published output.
//!
//! Everything persisted is pretty-printed JSON under one data directory so
//! runs stay auditable with ordinary diff tools.
//!
//! ## Directory Structure
//!
//! ```text
//! data/
//! ├── config.toml              # Refresh configuration
//! ├── provider_health.json     # Provider id -> health record
//! ├── cache/
//! │   ├── url_checks.json      # URL hash -> live check result
//! │   └── html/                # One file per cached listing page
//! │       └── <sha256>.json
//! └── output/
//!     ├── events.json          # Published event set
//!     └── run_summary.json     # Last run's counts and rejections
//! ```

pub mod cache;
pub mod local;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::health::ProviderHealthRecord;
use crate::models::{EventItem, RunSummary};

// Re-export for convenience
pub use cache::{Expiring, HtmlCacheEntry, MemoryStore, UrlCheckEntry};
pub use local::{DirStore, JsonFileStore, LocalStorage};

/// Key-value store with caller-managed expiry.
///
/// Implementations only store and return entries; freshness is decided by
/// the caller through [`Expiring`].
#[async_trait]
pub trait CacheStore<E>: Send + Sync
where
    E: Send + Sync,
{
    async fn get(&self, key: &str) -> Result<Option<E>>;

    async fn put(&self, key: &str, entry: E) -> Result<()>;
}

/// Header for events.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedData {
    /// ISO 8601 timestamp of last update
    pub updated_at: DateTime<Utc>,
    /// Total event count
    pub count: usize,
    /// The events array
    pub events: Vec<EventItem>,
}

impl PublishedData {
    pub fn new(events: Vec<EventItem>) -> Self {
        Self {
            updated_at: Utc::now(),
            count: events.len(),
            events,
        }
    }
}

/// Destination of a run's results.
#[async_trait]
pub trait OutputStore: Send + Sync {
    /// Load the currently published events (empty if none yet).
    async fn load_published(&self) -> Result<Vec<EventItem>>;

    /// Replace the published event set.
    async fn write_published(&self, events: &[EventItem]) -> Result<()>;

    /// Write the run summary.
    async fn write_summary(&self, summary: &RunSummary) -> Result<()>;
}

/// Durable provider health records.
#[async_trait]
pub trait HealthStore: Send + Sync {
    async fn load_health(&self) -> Result<BTreeMap<String, ProviderHealthRecord>>;

    async fn save_health(&self, records: &BTreeMap<String, ProviderHealthRecord>) -> Result<()>;
}
