//! Remote data source abstraction.

use crate::error::{SyncError, SyncResult};
use marksync_protocol::{BookmarkRecord, Key, RemoteManifest, RemoteManifestEntry, UpdateMeta};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A remote bookmark collection.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, in-memory fixtures, scripted fakes for testing).
///
/// Every method may fail with [`SyncError::RemoteUnavailable`] (stop the
/// pass, retry later) or [`SyncError::TransientFetch`] (skip what failed,
/// continue).
pub trait RemoteDataSource: Send + Sync {
    /// Fetches the cheap "last changed" summary.
    fn fetch_update_meta(&self) -> SyncResult<UpdateMeta>;

    /// Fetches the full manifest of the collection, in remote order.
    fn fetch_manifest(&self) -> SyncResult<RemoteManifest>;

    /// Fetches full records for `keys`.
    ///
    /// Records may come back in any order; unknown keys are omitted.
    fn fetch_records(&self, keys: &[Key]) -> SyncResult<Vec<BookmarkRecord>>;
}

/// Serializable snapshot of a remote collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSnapshot {
    /// Update metadata.
    pub update: UpdateMeta,
    /// Records, in remote order.
    #[serde(default)]
    pub records: Vec<BookmarkRecord>,
}

/// An in-memory remote source.
///
/// Serves a mutable set of records, can be switched to "unavailable", and
/// logs every record fetch for assertions.
#[derive(Debug)]
pub struct MemorySource {
    meta: Mutex<UpdateMeta>,
    records: Mutex<Vec<BookmarkRecord>>,
    available: AtomicBool,
    meta_calls: AtomicUsize,
    manifest_calls: AtomicUsize,
    record_calls: Mutex<Vec<Vec<Key>>>,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self {
            meta: Mutex::new(UpdateMeta::default()),
            records: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            meta_calls: AtomicUsize::new(0),
            manifest_calls: AtomicUsize::new(0),
            record_calls: Mutex::new(Vec::new()),
        }
    }
}

impl MemorySource {
    /// Creates an empty, available source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source serving `snapshot`.
    pub fn from_snapshot(snapshot: RemoteSnapshot) -> Self {
        let source = Self::new();
        *source.meta.lock() = snapshot.update;
        *source.records.lock() = snapshot.records;
        source
    }

    /// Creates a source serving `records` with the given update time.
    pub fn with_records(last_update_ms: u64, records: Vec<BookmarkRecord>) -> Self {
        Self::from_snapshot(RemoteSnapshot {
            update: UpdateMeta::new(last_update_ms),
            records,
        })
    }

    /// Inserts or replaces a record, keeping the position of a replaced one.
    pub fn upsert_record(&self, record: BookmarkRecord) {
        let mut records = self.records.lock();
        match records.iter_mut().find(|r| r.key == record.key) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    /// Removes a record by key.
    pub fn remove_record(&self, key: &str) {
        self.records.lock().retain(|r| r.key.as_str() != key);
    }

    /// Sets the reported update time.
    pub fn set_update_time(&self, last_update_ms: u64) {
        self.meta.lock().last_update_ms = last_update_ms;
    }

    /// Sets the availability state.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Returns the keys requested by each record fetch so far.
    pub fn record_calls(&self) -> Vec<Vec<Key>> {
        self.record_calls.lock().clone()
    }

    /// Returns the number of metadata fetches so far.
    pub fn meta_calls(&self) -> usize {
        self.meta_calls.load(Ordering::SeqCst)
    }

    /// Returns the number of manifest fetches so far.
    pub fn manifest_calls(&self) -> usize {
        self.manifest_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> SyncResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SyncError::unavailable("memory source switched off"))
        }
    }
}

impl RemoteDataSource for MemorySource {
    fn fetch_update_meta(&self) -> SyncResult<UpdateMeta> {
        self.meta_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.meta.lock().clone())
    }

    fn fetch_manifest(&self) -> SyncResult<RemoteManifest> {
        self.manifest_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self
            .records
            .lock()
            .iter()
            .map(|r| RemoteManifestEntry::new(r.key.clone(), r.content_hash.clone()))
            .collect())
    }

    fn fetch_records(&self, keys: &[Key]) -> SyncResult<Vec<BookmarkRecord>> {
        self.record_calls.lock().push(keys.to_vec());
        self.check_available()?;

        let wanted: HashSet<&Key> = keys.iter().collect();
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|r| wanted.contains(&r.key))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str, hash: &str) -> BookmarkRecord {
        BookmarkRecord::new(key, format!("https://{key}.example"), hash)
    }

    #[test]
    fn manifest_follows_record_order() {
        let source = MemorySource::with_records(1, vec![record("b", "h2"), record("a", "h1")]);
        let manifest = source.fetch_manifest().unwrap();

        let keys: Vec<_> = manifest.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(source.manifest_calls(), 1);
    }

    #[test]
    fn fetch_records_omits_unknown_keys() {
        let source = MemorySource::with_records(1, vec![record("a", "h1")]);
        let records = source
            .fetch_records(&[Key::from("a"), Key::from("missing")])
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(source.record_calls().len(), 1);
        assert_eq!(source.record_calls()[0].len(), 2);
    }

    #[test]
    fn unavailable_source_fails_every_call() {
        let source = MemorySource::new();
        source.set_available(false);

        assert!(matches!(
            source.fetch_update_meta(),
            Err(SyncError::RemoteUnavailable(_))
        ));
        assert!(source.fetch_manifest().unwrap_err().ends_pass());
        assert!(source.fetch_records(&[]).unwrap_err().ends_pass());
    }

    #[test]
    fn upsert_keeps_position() {
        let source = MemorySource::with_records(1, vec![record("a", "h1"), record("b", "h2")]);
        source.upsert_record(record("a", "h9"));
        source.remove_record("b");
        source.upsert_record(record("c", "h3"));

        let manifest = source.fetch_manifest().unwrap();
        let entries: Vec<_> = manifest
            .iter()
            .map(|e| (e.key.as_str(), e.content_hash.as_str()))
            .collect();
        assert_eq!(entries, vec![("a", "h9"), ("c", "h3")]);
    }
}
