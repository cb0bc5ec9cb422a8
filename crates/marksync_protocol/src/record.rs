//! Full bookmark records.

use crate::key::Key;
use crate::manifest::LocalManifestEntry;
use serde::{Deserialize, Serialize};

/// A bookmark as returned by a batched record fetch.
///
/// Records for removals are synthesized from the local manifest entry and
/// only carry `key`, `url` and `content_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkRecord {
    /// Content-identity key.
    pub key: Key,
    /// Bookmarked URL.
    pub url: String,
    /// Current content hash.
    pub content_hash: String,
    /// Title given by the owner.
    #[serde(default)]
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Tags, in remote order.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Creation time in remote clock milliseconds, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at_ms: Option<u64>,
    /// Whether the bookmark is public.
    #[serde(default)]
    pub shared: bool,
    /// Whether the bookmark is flagged "read later".
    #[serde(default)]
    pub to_read: bool,
    /// Opaque passthrough field reported by the remote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub others: Option<String>,
}

impl BookmarkRecord {
    /// Creates a record with the identifying fields set and everything else empty.
    pub fn new(key: impl Into<Key>, url: impl Into<String>, content_hash: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            url: url.into(),
            content_hash: content_hash.into(),
            title: String::new(),
            description: String::new(),
            tags: Vec::new(),
            created_at_ms: None,
            shared: false,
            to_read: false,
            others: None,
        }
    }

    /// Synthesizes the minimal record describing a local entry being removed.
    #[must_use]
    pub fn from_local(entry: &LocalManifestEntry) -> Self {
        Self::new(entry.key.clone(), entry.url.clone(), entry.content_hash.clone())
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_local_keeps_identity() {
        let entry = LocalManifestEntry::new("https://a.example", "k1", "h1", 42);
        let record = BookmarkRecord::from_local(&entry);

        assert_eq!(record.key, Key::from("k1"));
        assert_eq!(record.url, "https://a.example");
        assert_eq!(record.content_hash, "h1");
        assert!(record.title.is_empty());
        assert!(record.tags.is_empty());
    }

    #[test]
    fn decodes_sparse_json() {
        let json = r#"{"key":"k","url":"https://b.example","content_hash":"h","tags":["rust"]}"#;
        let record: BookmarkRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.tags, vec!["rust".to_string()]);
        assert!(!record.shared);
        assert_eq!(record.others, None);
    }
}
