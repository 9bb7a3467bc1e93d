//! Reading Progress Store
//!
//! Remembers, per work, which HUD page the reader was on. All records live in
//! one JSON blob under [`PROGRESS_STORAGE_KEY`]; every write rewrites the whole
//! blob, so the map is the unit of durability.
//!
//! Reads are forgiving: a missing, unreadable or malformed blob is treated as
//! "no progress yet" and never surfaces as an error. A single record that no
//! longer decodes is skipped on read but kept verbatim in the blob, so one
//! stale entry never costs the others. Writes report failures to the caller.
//!
//! ```text
//! { "<workId>": { "pageIndex": 3, "totalPages": 12, "updatedAt": 1718000000000 } }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Storage key of the persisted progress blob
pub const PROGRESS_STORAGE_KEY: &str = "aozora-reader-progress/v1";

/// Saved cursor for one work
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingProgress {
    /// Zero-based page the reader is on
    pub page_index: usize,
    /// Page count of the work at save time
    pub total_pages: usize,
    /// Milliseconds since the Unix epoch
    pub updated_at: i64,
}

impl ReadingProgress {
    /// Fraction of the work read, in percent (the current page counts as read)
    #[must_use]
    pub fn percent(&self) -> f32 {
        if self.total_pages == 0 {
            0.0
        } else {
            ((self.page_index + 1) as f32 / self.total_pages as f32) * 100.0
        }
    }
}

/// Work id → progress
pub type ReadingProgressMap = HashMap<String, ReadingProgress>;

/// Blob as stored, including records that no longer decode
type RawProgressMap = Map<String, Value>;

/// Errors from the durable key-value surface
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying storage could not be written
    #[error("Failed to write {key} at {path}: {source}")]
    Write {
        /// Logical storage key
        key: String,
        /// File that was being written
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Progress map could not be serialized
    #[error("Failed to serialize progress: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Minimal durable string key-value surface
///
/// `get` swallows read failures (returns `None`); only writes can fail.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    async fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Key-value store that keeps one file per key under a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir` (created lazily on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default data directory: `$XDG_DATA_HOME/aozora-companion`
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("aozora-companion"))
    }

    /// Directory this store writes into
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Some(raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Unreadable store entry");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let write_err = |source| StoreError::Write {
            key: key.to_string(),
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(write_err)?;
        // Atomic replace via rename
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(write_err)?;
        Ok(())
    }
}

/// In-memory key-value store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Durable map of work id → [`ReadingProgress`]
///
/// Construct once and share via `Arc`. The read-modify-write of the blob is
/// serialized by an internal lock held across the backend calls.
pub struct ProgressStore {
    backend: Arc<dyn KeyValueStore>,
    write_lock: tokio::sync::Mutex<()>,
}

impl ProgressStore {
    /// Create a store over the given key-value surface
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Store backed by [`MemoryStore`]
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Every record that decodes; empty when storage is absent or malformed
    pub async fn get_all(&self) -> ReadingProgressMap {
        decode_records(&self.load_raw().await)
    }

    /// Saved progress for one work
    pub async fn get(&self, work_id: &str) -> Option<ReadingProgress> {
        let raw = self.load_raw().await;
        decode_record(work_id, raw.get(work_id)?)
    }

    /// Upsert progress for `work_id`, stamping it with the current time
    ///
    /// `updated_at` is greater than every timestamp already in the store,
    /// even when two saves land within the same millisecond, so
    /// [`recent`](Self::recent) reflects write order. A stored timestamp at
    /// `i64::MAX` pins new records there instead of overflowing.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob cannot be serialized or written.
    pub async fn save(
        &self,
        work_id: &str,
        page_index: usize,
        total_pages: usize,
    ) -> Result<ReadingProgress, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut raw = self.load_raw().await;

        let now = chrono::Utc::now().timestamp_millis();
        let latest = decode_records(&raw)
            .values()
            .map(|p| p.updated_at)
            .max()
            .unwrap_or(i64::MIN);
        let updated_at = if latest >= now {
            latest.saturating_add(1)
        } else {
            now
        };

        let record = ReadingProgress {
            page_index,
            total_pages,
            updated_at,
        };
        raw.insert(work_id.to_string(), serde_json::to_value(record)?);
        self.write_raw(&raw).await?;

        tracing::debug!(work_id, page_index, total_pages, "Saved reading progress");
        Ok(record)
    }

    /// Delete progress for `work_id`; no-op when absent
    ///
    /// # Errors
    ///
    /// Returns an error if the blob cannot be rewritten.
    pub async fn remove(&self, work_id: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut raw = self.load_raw().await;
        if raw.remove(work_id).is_none() {
            return Ok(());
        }
        self.write_raw(&raw).await?;

        tracing::debug!(work_id, "Removed reading progress");
        Ok(())
    }

    /// Records ordered most recently updated first
    pub async fn recent(&self) -> Vec<(String, ReadingProgress)> {
        let mut entries: Vec<_> = self.get_all().await.into_iter().collect();
        entries.sort_by(|a, b| {
            b.1.updated_at
                .cmp(&a.1.updated_at)
                .then_with(|| a.0.cmp(&b.0))
        });
        entries
    }

    async fn load_raw(&self) -> RawProgressMap {
        let Some(raw) = self.backend.get(PROGRESS_STORAGE_KEY).await else {
            return RawProgressMap::new();
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                tracing::debug!("Ignoring progress blob that is not a JSON object");
                RawProgressMap::new()
            }
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed progress blob");
                RawProgressMap::new()
            }
        }
    }

    async fn write_raw(&self, raw: &RawProgressMap) -> Result<(), StoreError> {
        let blob = serde_json::to_string(raw)?;
        self.backend.set(PROGRESS_STORAGE_KEY, &blob).await
    }
}

fn decode_records(raw: &RawProgressMap) -> ReadingProgressMap {
    raw.iter()
        .filter_map(|(id, value)| Some((id.clone(), decode_record(id, value)?)))
        .collect()
}

fn decode_record(work_id: &str, value: &Value) -> Option<ReadingProgress> {
    match ReadingProgress::deserialize(value) {
        Ok(progress) => Some(progress),
        Err(e) => {
            tracing::debug!(work_id, error = %e, "Skipping unreadable progress record");
            None
        }
    }
}

impl std::fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_empty_store_has_no_progress() {
        let store = ProgressStore::in_memory();
        assert!(store.get_all().await.is_empty());
        assert_eq!(store.get("789").await, None);
    }

    #[tokio::test]
    async fn test_save_then_get_returns_saved_values() {
        let store = ProgressStore::in_memory();
        let saved = store.save("789", 4, 10).await.unwrap();

        let loaded = store.get("789").await.unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(loaded.page_index, 4);
        assert_eq!(loaded.total_pages, 10);
    }

    #[tokio::test]
    async fn test_save_advances_updated_at() {
        let store = ProgressStore::in_memory();
        let first = store.save("789", 0, 3).await.unwrap();
        let second = store.save("789", 1, 3).await.unwrap();
        let third = store.save("789", 2, 3).await.unwrap();

        assert!(second.updated_at > first.updated_at);
        assert!(third.updated_at > second.updated_at);
        assert_eq!(store.get("789").await.unwrap().page_index, 2);
    }

    #[tokio::test]
    async fn test_save_after_max_timestamp_does_not_overflow() {
        let backend = Arc::new(MemoryStore::new());
        let blob = serde_json::json!({
            "far": { "pageIndex": 0, "totalPages": 1, "updatedAt": i64::MAX }
        });
        backend
            .set(PROGRESS_STORAGE_KEY, &blob.to_string())
            .await
            .unwrap();
        let store = ProgressStore::new(backend);

        let saved = store.save("near", 1, 2).await.unwrap();
        assert_eq!(saved.updated_at, i64::MAX);
        assert_eq!(store.get("near").await, Some(saved));
        assert!(store.get("far").await.is_some());
    }

    #[tokio::test]
    async fn test_remove_present_and_absent() {
        let store = ProgressStore::in_memory();
        store.save("a", 1, 2).await.unwrap();
        store.save("b", 0, 5).await.unwrap();

        store.remove("missing").await.unwrap();
        assert_eq!(store.get_all().await.len(), 2);

        store.remove("a").await.unwrap();
        assert_eq!(store.get("a").await, None);
        assert!(store.get("b").await.is_some());
    }

    #[tokio::test]
    async fn test_malformed_blob_reads_as_empty() {
        let backend = Arc::new(MemoryStore::new());
        backend.set(PROGRESS_STORAGE_KEY, "{not json").await.unwrap();
        let store = ProgressStore::new(backend.clone());
        assert!(store.get_all().await.is_empty());

        backend.set(PROGRESS_STORAGE_KEY, "[1, 2, 3]").await.unwrap();
        assert!(store.get_all().await.is_empty());

        backend.set(PROGRESS_STORAGE_KEY, "null").await.unwrap();
        assert!(store.get_all().await.is_empty());

        // A save over a malformed blob starts a fresh map
        store.save("x", 0, 1).await.unwrap();
        assert_eq!(store.get_all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_bad_record_does_not_discard_others() {
        let backend = Arc::new(MemoryStore::new());
        let blob = serde_json::json!({
            "good": { "pageIndex": 3, "totalPages": 10, "updatedAt": 1_000 },
            "stale": { "pageIndex": -1, "totalPages": 10, "updatedAt": 2_000 }
        });
        backend
            .set(PROGRESS_STORAGE_KEY, &blob.to_string())
            .await
            .unwrap();
        let store = ProgressStore::new(backend.clone());

        assert_eq!(store.get("good").await.map(|p| p.page_index), Some(3));
        assert_eq!(store.get("stale").await, None);
        assert_eq!(store.get_all().await.len(), 1);

        store.save("other", 0, 1).await.unwrap();

        assert_eq!(store.get("good").await.map(|p| p.page_index), Some(3));
        assert!(store.get("other").await.is_some());
        let raw = backend.get(PROGRESS_STORAGE_KEY).await.unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["stale"], blob["stale"]);

        // The bad record can still be forgotten by id
        store.remove("stale").await.unwrap();
        let raw = backend.get(PROGRESS_STORAGE_KEY).await.unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert!(value.get("stale").is_none());
        assert_eq!(store.get_all().await.len(), 2);
    }

    #[tokio::test]
    async fn test_blob_uses_camel_case_layout() {
        let backend = Arc::new(MemoryStore::new());
        let store = ProgressStore::new(backend.clone());
        let saved = store.save("1567", 2, 9).await.unwrap();

        let raw = backend.get(PROGRESS_STORAGE_KEY).await.unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "1567": { "pageIndex": 2, "totalPages": 9, "updatedAt": saved.updated_at }
            })
        );
    }

    #[tokio::test]
    async fn test_recent_orders_by_updated_at() {
        let store = ProgressStore::in_memory();
        store.save("old", 0, 1).await.unwrap();
        store.save("mid", 0, 1).await.unwrap();
        store.save("new", 0, 1).await.unwrap();
        // Touch "old" again so it becomes the most recent
        store.save("old", 0, 1).await.unwrap();

        let ids: Vec<String> = store.recent().await.into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids[0], "old");
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let store = ProgressStore::new(Arc::new(FileStore::new(dir.path())));
        store.save("42", 7, 8).await.unwrap();

        let reopened = ProgressStore::new(Arc::new(FileStore::new(dir.path())));
        let progress = reopened.get("42").await.unwrap();
        assert_eq!((progress.page_index, progress.total_pages), (7, 8));
    }

    #[tokio::test]
    async fn test_file_store_missing_dir_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgressStore::new(Arc::new(FileStore::new(dir.path().join("nope"))));
        assert!(store.get_all().await.is_empty());
    }

    #[test]
    fn test_percent_counts_current_page() {
        let progress = ReadingProgress {
            page_index: 0,
            total_pages: 4,
            updated_at: 0,
        };
        assert!((progress.percent() - 25.0).abs() < f32::EPSILON);
    }
}
