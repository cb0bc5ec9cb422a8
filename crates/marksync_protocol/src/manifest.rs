//! Local and remote manifests.
//!
//! A manifest is a snapshot mapping content keys to the metadata needed to
//! detect change. The local manifest describes what is indexed now; the
//! remote manifest describes what exists now.

use crate::key::Key;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::time::Duration;

/// Age after which a local entry is re-fetched even if its hash still matches.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// What the local index knows about one bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalManifestEntry {
    /// Bookmarked URL.
    pub url: String,
    /// Content-identity key.
    pub key: Key,
    /// Content hash at the time of indexing.
    pub content_hash: String,
    /// Wall-clock time of the last indexing, in milliseconds since the epoch.
    pub last_indexed_at_ms: u64,
}

impl LocalManifestEntry {
    /// Creates a new entry.
    pub fn new(
        url: impl Into<String>,
        key: impl Into<Key>,
        content_hash: impl Into<String>,
        last_indexed_at_ms: u64,
    ) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
            content_hash: content_hash.into(),
            last_indexed_at_ms,
        }
    }

    /// Returns true if the entry was indexed more than `max_age` before `now_ms`.
    #[must_use]
    pub fn is_expired(&self, now_ms: u64, max_age: Duration) -> bool {
        let max_age_ms = u64::try_from(max_age.as_millis()).unwrap_or(u64::MAX);
        self.last_indexed_at_ms.saturating_add(max_age_ms) < now_ms
    }
}

/// Key → entry map describing the local index.
///
/// Keys are unique and iteration is in key order, which keeps plans
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalManifest {
    entries: BTreeMap<Key, LocalManifestEntry>,
}

impl LocalManifest {
    /// Creates an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the manifest has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up an entry by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&LocalManifestEntry> {
        self.entries.get(key)
    }

    /// Returns true if the manifest holds `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts or replaces an entry, returning the previous one.
    pub fn upsert(&mut self, entry: LocalManifestEntry) -> Option<LocalManifestEntry> {
        self.entries.insert(entry.key.clone(), entry)
    }

    /// Removes an entry by key.
    pub fn remove(&mut self, key: &str) -> Option<LocalManifestEntry> {
        self.entries.remove(key)
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = &LocalManifestEntry> {
        self.entries.values()
    }

    /// Returns true if any entry is older than `max_age`.
    #[must_use]
    pub fn has_expired(&self, now_ms: u64, max_age: Duration) -> bool {
        self.iter().any(|e| e.is_expired(now_ms, max_age))
    }
}

impl FromIterator<LocalManifestEntry> for LocalManifest {
    fn from_iter<I: IntoIterator<Item = LocalManifestEntry>>(iter: I) -> Self {
        let mut manifest = Self::new();
        for entry in iter {
            manifest.upsert(entry);
        }
        manifest
    }
}

impl IntoIterator for LocalManifest {
    type Item = LocalManifestEntry;
    type IntoIter = btree_map::IntoValues<Key, LocalManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

/// What the remote collection reports for one bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteManifestEntry {
    /// Content-identity key.
    pub key: Key,
    /// Current content hash.
    pub content_hash: String,
}

impl RemoteManifestEntry {
    /// Creates a new entry.
    pub fn new(key: impl Into<Key>, content_hash: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content_hash: content_hash.into(),
        }
    }
}

/// Ordered snapshot of the remote collection.
///
/// Order carries no meaning but is preserved so that the same snapshot always
/// yields the same plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteManifest {
    entries: Vec<RemoteManifestEntry>,
}

impl RemoteManifest {
    /// Creates a manifest from entries in remote order.
    #[must_use]
    pub fn new(entries: Vec<RemoteManifestEntry>) -> Self {
        Self { entries }
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the manifest has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in remote order.
    pub fn iter(&self) -> std::slice::Iter<'_, RemoteManifestEntry> {
        self.entries.iter()
    }
}

impl FromIterator<RemoteManifestEntry> for RemoteManifest {
    fn from_iter<I: IntoIterator<Item = RemoteManifestEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RemoteManifest {
    type Item = &'a RemoteManifestEntry;
    type IntoIter = std::slice::Iter<'a, RemoteManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
