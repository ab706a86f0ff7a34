//! Snapshot store for crawled permission records
//!
//! Holds one [`PermissionRecord`] per `(object_id, object_kind)`. A crawl
//! starts by clearing the store, then its tasks append concurrently. The
//! apply pass reads the snapshot back, so it can be re-run without crawling
//! again.

use crate::error::SyncError;
use async_trait::async_trait;
use dashmap::DashMap;
use permsync_acl::{ObjectKind, PermissionRecord};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Persisted table of permission records
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Drop every record from a previous crawl
    async fn begin_crawl(&self) -> Result<(), SyncError>;

    /// Insert one record; a later record for the same object replaces it
    async fn append(&self, record: PermissionRecord) -> Result<(), SyncError>;

    /// All records, ordered by kind then id
    async fn records(&self) -> Result<Vec<PermissionRecord>, SyncError>;
}

/// In-memory snapshot, safe for concurrent appends
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    records: DashMap<(ObjectKind, String), PermissionRecord>,
}

impl InMemorySnapshotStore {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn sorted(&self) -> Vec<PermissionRecord> {
        let mut records: Vec<_> = self.records.iter().map(|e| e.value().clone()).collect();
        records.sort_by(|a, b| {
            (a.object_kind, &a.object_id).cmp(&(b.object_kind, &b.object_id))
        });
        records
    }

    /// Write the snapshot as JSON lines, one record per line
    ///
    /// # Errors
    /// Returns [`SyncError::Io`] or [`SyncError::Snapshot`] on failure.
    pub fn save_jsonl(&self, path: impl AsRef<Path>) -> Result<(), SyncError> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        for record in self.sorted() {
            serde_json::to_writer(&mut writer, &record)
                .map_err(|e| SyncError::Snapshot(e.to_string()))?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Load a snapshot written by [`Self::save_jsonl`]
    ///
    /// # Errors
    /// Returns [`SyncError::Snapshot`] naming the first malformed line.
    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let store = Self::new();
        let reader = BufReader::new(File::open(path.as_ref())?);
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: PermissionRecord = serde_json::from_str(&line)
                .map_err(|e| SyncError::Snapshot(format!("line {}: {e}", index + 1)))?;
            store.insert(record);
        }
        Ok(store)
    }

    fn insert(&self, record: PermissionRecord) {
        self.records
            .insert((record.object_kind, record.object_id.clone()), record);
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn begin_crawl(&self) -> Result<(), SyncError> {
        self.records.clear();
        Ok(())
    }

    async fn append(&self, record: PermissionRecord) -> Result<(), SyncError> {
        self.insert(record);
        Ok(())
    }

    async fn records(&self) -> Result<Vec<PermissionRecord>, SyncError> {
        Ok(self.sorted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn record(kind: ObjectKind, id: &str, raw: &str) -> PermissionRecord {
        PermissionRecord {
            object_id: id.to_string(),
            object_kind: kind,
            raw_acl: raw.to_string(),
        }
    }

    #[tokio::test]
    async fn keyed_by_object_and_kind() {
        let store = InMemorySnapshotStore::new();
        store.append(record(ObjectKind::Queries, "1", "{}")).await.unwrap();
        store.append(record(ObjectKind::Alerts, "1", "{}")).await.unwrap();
        store
            .append(record(ObjectKind::Queries, "1", r#"{"access_control_list":[]}"#))
            .await
            .unwrap();

        let records = store.records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].object_kind, ObjectKind::Alerts);
        assert_eq!(records[1].raw_acl, r#"{"access_control_list":[]}"#);
    }

    #[tokio::test]
    async fn begin_crawl_overwrites_previous_snapshot() {
        let store = InMemorySnapshotStore::new();
        store.append(record(ObjectKind::Dashboards, "d", "{}")).await.unwrap();

        store.begin_crawl().await.unwrap();

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn concurrent_appends_are_all_kept() {
        let store = Arc::new(InMemorySnapshotStore::new());
        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .append(record(ObjectKind::Queries, &i.to_string(), "{}"))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.len(), 64);
    }

    #[tokio::test]
    async fn jsonl_persists_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.jsonl");
        let store = InMemorySnapshotStore::new();
        store.append(record(ObjectKind::Queries, "q1", "{}")).await.unwrap();
        store.append(record(ObjectKind::DataSources, "s1", "{}")).await.unwrap();

        store.save_jsonl(&path).unwrap();
        let loaded = InMemorySnapshotStore::load_jsonl(&path).unwrap();

        assert_eq!(loaded.records().await.unwrap(), store.records().await.unwrap());
    }

    #[test]
    fn load_reports_bad_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.jsonl");
        std::fs::write(&path, "{\"object_id\":\"x\"}\n").unwrap();

        let err = InMemorySnapshotStore::load_jsonl(&path).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }
}
