//! Sync operations.

use crate::key::Key;
use crate::manifest::LocalManifestEntry;
use crate::record::BookmarkRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a sync operation does to the local index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// The bookmark exists remotely but not locally.
    Add,
    /// The bookmark changed remotely, or its local copy expired.
    Update,
    /// The bookmark no longer exists remotely.
    Remove,
}

impl Action {
    /// Returns the lowercase name of the action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Add => "add",
            Action::Update => "update",
            Action::Remove => "remove",
        }
    }

    /// Returns true if the full record must be fetched from the remote.
    #[must_use]
    pub fn requires_fetch(&self) -> bool {
        !matches!(self, Action::Remove)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A planned operation that does not carry its record yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialOperation {
    /// Planned action.
    pub action: Action,
    /// Key of the remote bookmark to resolve.
    pub key: Key,
}

impl PartialOperation {
    /// Creates a partial Add.
    pub fn add(key: impl Into<Key>) -> Self {
        Self {
            action: Action::Add,
            key: key.into(),
        }
    }

    /// Creates a partial Update.
    pub fn update(key: impl Into<Key>) -> Self {
        Self {
            action: Action::Update,
            key: key.into(),
        }
    }
}

/// A fully resolved operation, ready to be applied and indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Action to perform.
    pub action: Action,
    /// Fetched record, or a synthesized one for removals.
    pub record: BookmarkRecord,
}

impl Operation {
    /// Pairs a fetched record with its action.
    #[must_use]
    pub fn new(action: Action, record: BookmarkRecord) -> Self {
        Self { action, record }
    }

    /// Creates a Remove operation from the local entry being dropped.
    #[must_use]
    pub fn remove(entry: &LocalManifestEntry) -> Self {
        Self {
            action: Action::Remove,
            record: BookmarkRecord::from_local(entry),
        }
    }

    /// Returns the key of the affected bookmark.
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.record.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_remove_skips_fetch() {
        assert!(Action::Add.requires_fetch());
        assert!(Action::Update.requires_fetch());
        assert!(!Action::Remove.requires_fetch());
    }

    #[test]
    fn remove_is_built_from_local_entry() {
        let entry = LocalManifestEntry::new("https://c.example", "c", "h3", 0);
        let op = Operation::remove(&entry);

        assert_eq!(op.action, Action::Remove);
        assert_eq!(op.key().as_str(), "c");
        assert_eq!(op.record.content_hash, "h3");
    }

    #[test]
    fn action_names() {
        assert_eq!(Action::Update.to_string(), "update");
        assert_eq!(
            serde_json::to_string(&Action::Remove).unwrap(),
            "\"remove\""
        );
    }
}
