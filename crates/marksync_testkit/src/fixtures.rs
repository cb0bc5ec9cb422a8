//! Test fixtures: records, scripted sources, recording builders and
//! stores that fail on demand.

use marksync_engine::{
    MemorySource, RecordBuilder, RemoteDataSource, RetryConfig, SyncConfig, SyncError, SyncResult,
};
use marksync_protocol::{
    Action, BookmarkRecord, Key, LocalManifestEntry, Operation, RemoteManifest, UpdateMeta,
};
use marksync_store::{AccountState, FileStore, ManifestStore, MemoryStore, StoreError, StoreResult};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Creates a record for `key` with a derived URL.
pub fn record(key: &str, hash: &str) -> BookmarkRecord {
    BookmarkRecord::new(key, format!("https://{key}.example"), hash)
}

/// Creates a local entry for `key` with a derived URL.
pub fn entry(key: &str, hash: &str, indexed_at_ms: u64) -> LocalManifestEntry {
    LocalManifestEntry::new(format!("https://{key}.example"), key, hash, indexed_at_ms)
}

/// Creates `count` records keyed `k0000`, `k0001`, ...
pub fn numbered_records(count: usize, hash: &str) -> Vec<BookmarkRecord> {
    (0..count).map(|i| record(&format!("k{i:04}"), hash)).collect()
}

/// A configuration that never sleeps: no request spacing, no retry delay.
pub fn fast_config(account: &str) -> SyncConfig {
    SyncConfig::new(account)
        .with_min_request_interval(Duration::ZERO)
        .with_retry(
            RetryConfig::new(3)
                .with_initial_delay(Duration::ZERO)
                .with_jitter(false),
        )
}

/// How a scripted call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedFailure {
    /// The remote is unavailable.
    Unavailable,
    /// A transient failure.
    Transient,
}

impl ScriptedFailure {
    fn to_error(self, what: &str) -> SyncError {
        match self {
            ScriptedFailure::Unavailable => SyncError::unavailable(format!("scripted: {what}")),
            ScriptedFailure::Transient => SyncError::transient(format!("scripted: {what}")),
        }
    }
}

/// A source backed by a [`MemorySource`] that fails chosen calls.
///
/// Record fetches are numbered from 1 across the lifetime of the source.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    inner: MemorySource,
    record_failures: Mutex<BTreeMap<usize, ScriptedFailure>>,
    meta_failures: Mutex<Vec<ScriptedFailure>>,
    manifest_failures: Mutex<Vec<ScriptedFailure>>,
    manifest_calls: AtomicUsize,
    record_calls: AtomicUsize,
}

impl ScriptedSource {
    /// Wraps `inner`.
    pub fn new(inner: MemorySource) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Makes the `call`-th record fetch fail.
    #[must_use]
    pub fn fail_record_call(self, call: usize, failure: ScriptedFailure) -> Self {
        self.record_failures.lock().insert(call, failure);
        self
    }

    /// Makes the next metadata fetches fail, in order.
    #[must_use]
    pub fn fail_meta(self, failures: &[ScriptedFailure]) -> Self {
        self.meta_failures.lock().extend_from_slice(failures);
        self
    }

    /// Makes the next manifest fetches fail, in order.
    #[must_use]
    pub fn fail_manifest(self, failures: &[ScriptedFailure]) -> Self {
        self.manifest_failures.lock().extend_from_slice(failures);
        self
    }

    /// Returns the wrapped source.
    pub fn inner(&self) -> &MemorySource {
        &self.inner
    }

    /// Returns the number of manifest fetches attempted so far, failed
    /// ones included.
    pub fn manifest_call_count(&self) -> usize {
        self.manifest_calls.load(Ordering::SeqCst)
    }

    /// Returns the number of record fetches attempted so far.
    pub fn record_call_count(&self) -> usize {
        self.record_calls.load(Ordering::SeqCst)
    }
}

impl RemoteDataSource for ScriptedSource {
    fn fetch_update_meta(&self) -> SyncResult<UpdateMeta> {
        if let Some(failure) = next_failure(&self.meta_failures) {
            return Err(failure.to_error("update metadata"));
        }
        self.inner.fetch_update_meta()
    }

    fn fetch_manifest(&self) -> SyncResult<RemoteManifest> {
        self.manifest_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = next_failure(&self.manifest_failures) {
            return Err(failure.to_error("manifest"));
        }
        self.inner.fetch_manifest()
    }

    fn fetch_records(&self, keys: &[Key]) -> SyncResult<Vec<BookmarkRecord>> {
        let call = self.record_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(failure) = self.record_failures.lock().get(&call).copied() {
            return Err(failure.to_error("record fetch"));
        }
        self.inner.fetch_records(keys)
    }
}

fn next_failure(queue: &Mutex<Vec<ScriptedFailure>>) -> Option<ScriptedFailure> {
    let mut failures = queue.lock();
    (!failures.is_empty()).then(|| failures.remove(0))
}

/// A record builder that logs every operation and fails chosen keys.
#[derive(Debug, Default)]
pub struct RecordingBuilder {
    /// Operations received, in order, including failed ones.
    pub operations: Vec<Operation>,
    failing: HashSet<Key>,
}

impl RecordingBuilder {
    /// Creates a builder accepting everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the build of `key` fail.
    #[must_use]
    pub fn failing_on(mut self, key: &str) -> Self {
        self.failing.insert(Key::from(key));
        self
    }

    /// Returns `(action, key)` pairs received, sorted.
    pub fn summary(&self) -> Vec<(Action, String)> {
        let mut out: Vec<_> = self
            .operations
            .iter()
            .map(|o| (o.action, o.key().as_str().to_string()))
            .collect();
        out.sort();
        out
    }

    /// Clears the log.
    pub fn clear(&mut self) {
        self.operations.clear();
    }
}

impl RecordBuilder for RecordingBuilder {
    fn build(&mut self, operation: &Operation) -> SyncResult<()> {
        self.operations.push(operation.clone());
        if self.failing.contains(operation.key()) {
            return Err(SyncError::RecordBuild {
                key: operation.key().clone(),
                message: "scripted build failure".into(),
            });
        }
        Ok(())
    }
}

/// A [`MemoryStore`] whose saves can be made to fail.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_saves: AtomicBool,
}

impl FailingStore {
    /// Creates an empty store that accepts saves.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes saves fail or succeed.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl ManifestStore for FailingStore {
    fn load(&self, account: &str) -> StoreResult<Option<AccountState>> {
        self.inner.load(account)
    }

    fn save(&self, state: &AccountState) -> StoreResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("scripted save failure")));
        }
        self.inner.save(state)
    }

    fn accounts(&self) -> StoreResult<Vec<String>> {
        self.inner.accounts()
    }
}

/// Runs a test with a file store in a temporary directory.
///
/// # Example
///
/// ```rust,ignore
/// use marksync_testkit::with_file_store;
///
/// #[test]
/// fn my_test() {
///     with_file_store(|store, dir| {
///         // ... test operations
///     });
/// }
/// ```
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(FileStore, &Path) -> R,
{
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = FileStore::open(temp_dir.path()).expect("Failed to open file store");
    f(store, temp_dir.path())
}
