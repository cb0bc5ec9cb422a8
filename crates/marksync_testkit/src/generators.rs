//! Property-based test generators using proptest.
//!
//! Provides strategies for generating local/remote manifest pairs whose
//! expected diff is known up front.

use marksync_protocol::{BookmarkRecord, Key, LocalManifest, LocalManifestEntry};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::time::Duration;

/// "Now" used by generated scenarios, in milliseconds.
pub const SCENARIO_NOW_MS: u64 = 1_700_000_000_000;

/// Maximum entry age used by generated scenarios.
pub const SCENARIO_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Strategy for generating bookmark keys.
pub fn key_strategy() -> impl Strategy<Value = Key> {
    prop::string::string_regex("[a-f0-9]{12}")
        .expect("Invalid regex")
        .prop_map(Key::from)
}

/// Strategy for generating content hashes.
pub fn hash_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-f0-9]{8}").expect("Invalid regex")
}

/// Where a generated key lives and how its two copies relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPlacement {
    /// Only in the remote collection.
    RemoteOnly,
    /// Only in the local manifest.
    LocalOnly,
    /// On both sides, same hash, freshly indexed.
    InSync,
    /// On both sides, different hashes.
    Changed,
    /// On both sides, same hash, indexed longer ago than the max age.
    Expired,
}

/// Strategy for generating key placements.
pub fn placement_strategy() -> impl Strategy<Value = KeyPlacement> {
    prop_oneof![
        3 => Just(KeyPlacement::RemoteOnly),
        2 => Just(KeyPlacement::LocalOnly),
        3 => Just(KeyPlacement::InSync),
        1 => Just(KeyPlacement::Changed),
        1 => Just(KeyPlacement::Expired),
    ]
}

/// A generated local manifest and remote collection.
#[derive(Debug, Clone)]
pub struct SyncScenario {
    /// Local manifest before the pass.
    pub local: LocalManifest,
    /// Remote records, in remote order.
    pub remote: Vec<BookmarkRecord>,
    /// Placement of every key.
    pub placements: BTreeMap<Key, KeyPlacement>,
}

impl SyncScenario {
    /// Builds a scenario from key placements.
    pub fn from_placements(placements: BTreeMap<Key, KeyPlacement>, hash: &str) -> Self {
        let fresh = SCENARIO_NOW_MS - 1000;
        let stale = SCENARIO_NOW_MS - SCENARIO_MAX_AGE.as_millis() as u64 - 1000;
        let url = |key: &Key| format!("https://{key}.example");

        let mut local = LocalManifest::new();
        let mut remote = Vec::new();
        for (key, placement) in &placements {
            let local_entry = |at: u64, h: &str| LocalManifestEntry::new(url(key), key.clone(), h, at);
            match placement {
                KeyPlacement::RemoteOnly => {
                    remote.push(BookmarkRecord::new(key.clone(), url(key), hash));
                }
                KeyPlacement::LocalOnly => {
                    local.upsert(local_entry(fresh, hash));
                }
                KeyPlacement::InSync => {
                    local.upsert(local_entry(fresh, hash));
                    remote.push(BookmarkRecord::new(key.clone(), url(key), hash));
                }
                KeyPlacement::Changed => {
                    local.upsert(local_entry(fresh, "0ld0ld0ld"));
                    remote.push(BookmarkRecord::new(key.clone(), url(key), hash));
                }
                KeyPlacement::Expired => {
                    local.upsert(local_entry(stale, hash));
                    remote.push(BookmarkRecord::new(key.clone(), url(key), hash));
                }
            }
        }

        Self {
            local,
            remote,
            placements,
        }
    }

    /// Counts keys with the given placement.
    pub fn count(&self, placement: KeyPlacement) -> usize {
        self.placements.values().filter(|p| **p == placement).count()
    }

    /// Returns the number of operations a pass must produce.
    pub fn expected_operations(&self) -> usize {
        self.placements.len() - self.count(KeyPlacement::InSync)
    }

    /// Returns the number of operations that need a record fetch.
    pub fn expected_fetches(&self) -> usize {
        self.count(KeyPlacement::RemoteOnly)
            + self.count(KeyPlacement::Changed)
            + self.count(KeyPlacement::Expired)
    }
}

/// Strategy for generating sync scenarios with up to `max_keys` keys.
pub fn scenario_strategy(max_keys: usize) -> impl Strategy<Value = SyncScenario> {
    (
        prop::collection::btree_map(key_strategy(), placement_strategy(), 0..max_keys),
        hash_strategy(),
    )
        .prop_map(|(placements, hash)| SyncScenario::from_placements(placements, &hash))
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
