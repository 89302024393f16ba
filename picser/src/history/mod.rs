//! Client-local upload history.
//!
//! The history is a convenience for the command-line client: an ordered list of past uploads,
//! newest first, bounded to [`DEFAULT_CAPACITY`] entries. The server never sees it. It is
//! best-effort throughout: read failures yield an empty list and write failures leave the
//! persisted list as it was. Neither is surfaced to the caller.
//!
//! Two stores are provided:
//!
//! - [`MemoryHistoryStore`]: in-process, for tests
//! - [`JsonFileHistoryStore`]: a JSON document on disk holding the list under [`STORAGE_KEY`]
//!
//! Concurrent writers to the same file are last-write-wins; nothing merges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::models::upload::UploadResponse;
use crate::types::HistoryId;
use crate::upload::UploadUrls;

/// Maximum number of records kept
pub const DEFAULT_CAPACITY: usize = 50;

/// Key under which the list is persisted
pub const STORAGE_KEY: &str = "picser_upload_history";

/// One past upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: HistoryId,
    pub filename: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<UploadUrls>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(rename = "uploadDate")]
    pub upload_date: DateTime<Utc>,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
}

impl HistoryRecord {
    /// Record a successful upload, stamped now with a fresh id.
    pub fn from_response(response: &UploadResponse) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: response.filename.clone(),
            url: response.url.clone(),
            urls: Some(response.urls.clone()),
            github_url: response.github_url.clone(),
            upload_date: Utc::now(),
            size: response.size,
            content_type: response.content_type.clone(),
        }
    }
}

/// Bounded, newest-first list of [`HistoryRecord`]s.
pub trait HistoryStore: Send + Sync {
    /// Insert `record` at the front, dropping the oldest entries beyond `capacity`.
    fn append(&self, record: HistoryRecord, capacity: usize);

    /// All records, newest first.
    fn list(&self) -> Vec<HistoryRecord>;

    /// Remove every record. Individual records are never deleted.
    fn clear(&self);
}

fn push_front(mut records: Vec<HistoryRecord>, record: HistoryRecord, capacity: usize) -> Vec<HistoryRecord> {
    records.insert(0, record);
    records.truncate(capacity);
    records
}

#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    records: Mutex<Vec<HistoryRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn append(&self, record: HistoryRecord, capacity: usize) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        *records = push_front(std::mem::take(&mut *records), record, capacity);
    }

    fn list(&self) -> Vec<HistoryRecord> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn clear(&self) {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

/// History persisted as `{"picser_upload_history": [...]}` in a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileHistoryStore {
    path: PathBuf,
}

impl JsonFileHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> anyhow::Result<Vec<HistoryRecord>> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut document: BTreeMap<String, Vec<HistoryRecord>> = serde_json::from_slice(&raw)?;
        Ok(document.remove(STORAGE_KEY).unwrap_or_default())
    }

    fn write(&self, records: &[HistoryRecord]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let document = serde_json::json!({ STORAGE_KEY: records });
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, serde_json::to_vec_pretty(&document)?)?;
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

impl HistoryStore for JsonFileHistoryStore {
    fn append(&self, record: HistoryRecord, capacity: usize) {
        let records = push_front(self.list(), record, capacity);
        match self.write(&records) {
            Ok(()) => debug!(path = %self.path.display(), entries = records.len(), "History updated"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to write upload history"),
        }
    }

    fn list(&self) -> Vec<HistoryRecord> {
        self.read().unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Failed to read upload history, treating as empty");
            Vec::new()
        })
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to clear upload history"),
        }
    }
}
