//! Cache entry types and the in-memory store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::storage::CacheStore;

/// An entry that stops being valid at a known instant.
pub trait Expiring {
    fn expires_at(&self) -> DateTime<Utc>;

    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }
}

/// Cached Stage A result for one canonical URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UrlCheckEntry {
    /// SHA-256 of the canonical URL
    pub key: String,
    pub url: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Expiring for UrlCheckEntry {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// Cached body of a listing page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HtmlCacheEntry {
    pub url: String,
    pub status: u16,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Expiring for HtmlCacheEntry {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// Process-local store, used by tests and dry experiments.
#[derive(Debug)]
pub struct MemoryStore<E> {
    entries: RwLock<HashMap<String, E>>,
}

impl<E> MemoryStore<E> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<E> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E> CacheStore<E> for MemoryStore<E>
where
    E: Clone + Send + Sync,
{
    async fn get(&self, key: &str) -> Result<Option<E>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, entry: E) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }
}
