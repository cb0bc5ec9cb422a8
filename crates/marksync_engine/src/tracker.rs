//! Local manifest bookkeeping.

use crate::clock::Clock;
use marksync_protocol::{Action, Key, LocalManifest, LocalManifestEntry, Operation};

/// Undo token for one applied operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedChange {
    /// Key the operation touched.
    pub key: Key,
    /// Entry held under `key` before the operation, if any.
    pub previous: Option<LocalManifestEntry>,
}

/// The single writer of the local manifest during a pass.
///
/// Add and Update share the same bookkeeping; the distinction only matters
/// to whoever indexes the records.
pub struct ManifestChangeTracker<'a> {
    manifest: LocalManifest,
    clock: &'a dyn Clock,
}

impl<'a> ManifestChangeTracker<'a> {
    /// Takes ownership of the authoritative manifest for the pass.
    pub fn new(manifest: LocalManifest, clock: &'a dyn Clock) -> Self {
        Self { manifest, clock }
    }

    /// Returns the manifest as mutated so far.
    pub fn manifest(&self) -> &LocalManifest {
        &self.manifest
    }

    /// Gives the manifest back.
    pub fn into_manifest(self) -> LocalManifest {
        self.manifest
    }

    /// Applies `operation` to the manifest.
    ///
    /// # Panics
    ///
    /// Panics if a Remove targets a key the manifest does not hold. Removes
    /// are only ever planned from keys present locally, so this is a bug in
    /// the plan, not a runtime condition.
    pub fn apply(&mut self, operation: &Operation) -> AppliedChange {
        let key = operation.key().clone();
        let previous = match operation.action {
            Action::Add | Action::Update => self.manifest.upsert(LocalManifestEntry {
                url: operation.record.url.clone(),
                key: key.clone(),
                content_hash: operation.record.content_hash.clone(),
                last_indexed_at_ms: self.clock.now_ms(),
            }),
            Action::Remove => match self.manifest.remove(key.as_str()) {
                Some(entry) => Some(entry),
                None => panic!("remove of key {key} which is not in the local manifest"),
            },
        };

        AppliedChange { key, previous }
    }

    /// Restores the manifest to its state before `change` was applied.
    pub fn revert(&mut self, change: AppliedChange) {
        match change.previous {
            Some(entry) => {
                self.manifest.upsert(entry);
            }
            None => {
                self.manifest.remove(change.key.as_str());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use marksync_protocol::BookmarkRecord;

    fn op(action: Action, key: &str, hash: &str) -> Operation {
        Operation::new(action, BookmarkRecord::new(key, format!("https://{key}.example"), hash))
    }

    #[test]
    fn add_stamps_indexing_time() {
        let clock = ManualClock::new(777);
        let mut tracker = ManifestChangeTracker::new(LocalManifest::new(), &clock);

        let change = tracker.apply(&op(Action::Add, "a", "h1"));
        assert!(change.previous.is_none());

        let entry = tracker.manifest().get("a").unwrap();
        assert_eq!(entry.content_hash, "h1");
        assert_eq!(entry.url, "https://a.example");
        assert_eq!(entry.last_indexed_at_ms, 777);
    }

    #[test]
    fn update_replaces_entry() {
        let clock = ManualClock::new(10);
        let manifest: LocalManifest =
            std::iter::once(LocalManifestEntry::new("https://old.example", "a", "h1", 1)).collect();
        let mut tracker = ManifestChangeTracker::new(manifest, &clock);

        let change = tracker.apply(&op(Action::Update, "a", "h2"));
        assert_eq!(change.previous.unwrap().content_hash, "h1");

        let entry = tracker.manifest().get("a").unwrap();
        assert_eq!(entry.content_hash, "h2");
        assert_eq!(entry.url, "https://a.example");
        assert_eq!(entry.last_indexed_at_ms, 10);
    }

    #[test]
    fn remove_deletes_entry() {
        let clock = ManualClock::new(10);
        let manifest: LocalManifest =
            std::iter::once(LocalManifestEntry::new("https://c.example", "c", "h3", 1)).collect();
        let mut tracker = ManifestChangeTracker::new(manifest, &clock);

        tracker.apply(&op(Action::Remove, "c", "h3"));
        assert!(tracker.into_manifest().is_empty());
    }

    #[test]
    #[should_panic(expected = "not in the local manifest")]
    fn remove_of_unknown_key_panics() {
        let clock = ManualClock::new(10);
        let mut tracker = ManifestChangeTracker::new(LocalManifest::new(), &clock);
        tracker.apply(&op(Action::Remove, "ghost", "h"));
    }

    #[test]
    fn revert_undoes_each_action() {
        let clock = ManualClock::new(10);
        let original: LocalManifest = vec![
            LocalManifestEntry::new("https://a.example", "a", "h1", 1),
            LocalManifestEntry::new("https://c.example", "c", "h3", 1),
        ]
        .into_iter()
        .collect();
        let mut tracker = ManifestChangeTracker::new(original.clone(), &clock);

        let added = tracker.apply(&op(Action::Add, "b", "h2"));
        let updated = tracker.apply(&op(Action::Update, "a", "h9"));
        let removed = tracker.apply(&op(Action::Remove, "c", "h3"));

        tracker.revert(removed);
        tracker.revert(updated);
        tracker.revert(added);
        assert_eq!(tracker.manifest(), &original);
    }
}
