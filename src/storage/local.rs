//! Local filesystem storage implementation.
//!
//! All writes go to a uniquely named temp file next to the target and are
//! renamed into place, so readers never observe a half-written file.
//! Writers to the same JSON map inside one process are serialized by a
//! mutex and re-read the file before modifying it.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::health::ProviderHealthRecord;
use crate::models::{EventItem, RunSummary};
use crate::storage::{
    CacheStore, Expiring, HealthStore, HtmlCacheEntry, OutputStore, PublishedData, UrlCheckEntry,
};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write bytes atomically (write to temp, then rename).
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let suffix = format!(
        "{}.{}.tmp",
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!("{file_name}.{suffix}"));

    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(AppError::storage(path.display().to_string(), e));
    }
    Ok(())
}

/// Write JSON data atomically.
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes).await
}

/// Read bytes, returning None if the file doesn't exist.
pub async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

/// Read JSON data, returning None if the file doesn't exist.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match read_bytes(path).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// A whole key-value map kept in one JSON file.
///
/// Suited to small entries such as URL-check results. Expired entries are
/// dropped whenever the file is rewritten.
pub struct JsonFileStore<E> {
    path: PathBuf,
    entries: Mutex<Option<BTreeMap<String, E>>>,
}

impl<E> JsonFileStore<E>
where
    E: DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the map from disk. A corrupt file is logged and treated as empty.
    async fn read_map(&self) -> Result<BTreeMap<String, E>> {
        match read_json(&self.path).await {
            Ok(map) => Ok(map.unwrap_or_default()),
            Err(AppError::Json(e)) => {
                log::warn!(
                    "Cache file {} is corrupt ({}); starting empty",
                    self.path.display(),
                    e
                );
                Ok(BTreeMap::new())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<E> CacheStore<E> for JsonFileStore<E>
where
    E: Serialize + DeserializeOwned + Expiring + Clone + Send + Sync,
{
    async fn get(&self, key: &str) -> Result<Option<E>> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_map().await?);
        }
        Ok(guard.as_ref().and_then(|map| map.get(key).cloned()))
    }

    async fn put(&self, key: &str, entry: E) -> Result<()> {
        let mut guard = self.entries.lock().await;

        // Read-modify-write against the file, not the in-memory copy.
        let now = Utc::now();
        let mut map = self.read_map().await?;
        map.retain(|_, e| e.is_fresh(now));
        map.insert(key.to_string(), entry);

        write_json(&self.path, &map).await?;
        *guard = Some(map);
        Ok(())
    }
}

/// One JSON file per key inside a directory; keys are hashed into file names.
///
/// Suited to large entries such as cached page bodies.
pub struct DirStore<E> {
    dir: PathBuf,
    _entry: PhantomData<fn() -> E>,
}

impl<E> DirStore<E> {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            _entry: PhantomData,
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let name = hex::encode(Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{name}.json"))
    }
}

#[async_trait]
impl<E> CacheStore<E> for DirStore<E>
where
    E: Serialize + DeserializeOwned + Send + Sync,
{
    async fn get(&self, key: &str) -> Result<Option<E>> {
        let path = self.entry_path(key);
        match read_json(&path).await {
            Err(AppError::Json(e)) => {
                log::warn!("Cache entry {} is corrupt ({})", path.display(), e);
                Ok(None)
            }
            other => other,
        }
    }

    async fn put(&self, key: &str, entry: E) -> Result<()> {
        write_json(&self.entry_path(key), &entry).await
    }
}

/// Local filesystem layout rooted at the data directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    pub fn events_path(&self) -> PathBuf {
        self.path("output/events.json")
    }

    pub fn summary_path(&self) -> PathBuf {
        self.path("output/run_summary.json")
    }

    pub fn health_path(&self) -> PathBuf {
        self.path("provider_health.json")
    }

    /// URL-check cache for Stage A.
    pub fn url_check_store(&self) -> JsonFileStore<UrlCheckEntry> {
        JsonFileStore::new(self.path("cache/url_checks.json"))
    }

    /// Listing page cache for the fetcher.
    pub fn html_store(&self) -> DirStore<HtmlCacheEntry> {
        DirStore::new(self.path("cache/html"))
    }
}

#[async_trait]
impl OutputStore for LocalStorage {
    async fn load_published(&self) -> Result<Vec<EventItem>> {
        match read_json::<PublishedData>(&self.events_path()).await? {
            Some(data) => Ok(data.events),
            None => {
                log::debug!("No events.json found");
                Ok(Vec::new())
            }
        }
    }

    async fn write_published(&self, events: &[EventItem]) -> Result<()> {
        let data = PublishedData::new(events.to_vec());
        write_json(&self.events_path(), &data).await?;
        log::info!(
            "Published {} events to {}",
            data.count,
            self.events_path().display()
        );
        Ok(())
    }

    async fn write_summary(&self, summary: &RunSummary) -> Result<()> {
        write_json(&self.summary_path(), summary).await
    }
}

#[async_trait]
impl HealthStore for LocalStorage {
    async fn load_health(&self) -> Result<BTreeMap<String, ProviderHealthRecord>> {
        Ok(read_json(&self.health_path()).await?.unwrap_or_default())
    }

    async fn save_health(&self, records: &BTreeMap<String, ProviderHealthRecord>) -> Result<()> {
        write_json(&self.health_path(), records).await
    }
}
