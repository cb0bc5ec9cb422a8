//! Remote update metadata.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cheap summary the remote collection returns before a full manifest fetch.
///
/// Only `last_update_ms` has meaning to marksync. Any other counters the
/// remote reports are carried verbatim in `counters`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMeta {
    /// Time of the most recent change to the collection, in remote clock
    /// milliseconds since the epoch.
    pub last_update_ms: u64,
    /// Opaque passthrough counters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub counters: BTreeMap<String, u64>,
}

impl UpdateMeta {
    /// Creates metadata with no extra counters.
    #[must_use]
    pub fn new(last_update_ms: u64) -> Self {
        Self {
            last_update_ms,
            counters: BTreeMap::new(),
        }
    }

    /// Returns true if the remote changed after `marker_ms`.
    #[must_use]
    pub fn changed_since(&self, marker_ms: u64) -> bool {
        self.last_update_ms > marker_ms
    }
}
