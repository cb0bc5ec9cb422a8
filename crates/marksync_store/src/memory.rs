//! In-memory store for testing.

use crate::error::StoreResult;
use crate::store::{validate_account, AccountState, ManifestStore};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory store.
///
/// Suitable for:
/// - Unit and integration tests
/// - One-shot runs that don't need state across processes
///
/// # Example
///
/// ```rust
/// use marksync_store::{AccountState, ManifestStore, MemoryStore};
///
/// let store = MemoryStore::new();
/// let mut state = AccountState::new("bob");
/// state.last_sync_ms = Some(10);
/// store.save(&state).unwrap();
/// assert_eq!(store.load("bob").unwrap().unwrap().last_sync_ms, Some(10));
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    states: RwLock<BTreeMap<String, AccountState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `state`.
    #[must_use]
    pub fn with_state(state: AccountState) -> Self {
        let store = Self::new();
        store.states.write().insert(state.account.clone(), state);
        store
    }

    /// Returns the number of saved accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    /// Returns true if nothing was saved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }
}

impl ManifestStore for MemoryStore {
    fn load(&self, account: &str) -> StoreResult<Option<AccountState>> {
        validate_account(account)?;
        Ok(self.states.read().get(account).cloned())
    }

    fn save(&self, state: &AccountState) -> StoreResult<()> {
        validate_account(&state.account)?;
        self.states
            .write()
            .insert(state.account.clone(), state.clone());
        Ok(())
    }

    fn accounts(&self) -> StoreResult<Vec<String>> {
        Ok(self.states.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;
    use marksync_protocol::LocalManifestEntry;

    #[test]
    fn load_missing_is_none() {
        let store = MemoryStore::new();
        assert!(store.load("nobody").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn save_replaces_previous_state() {
        let store = MemoryStore::new();

        let mut state = AccountState::new("alice");
        store.save(&state).unwrap();

        state
            .manifest
            .upsert(LocalManifestEntry::new("https://a.example", "a", "h1", 1));
        state.last_sync_ms = Some(99);
        store.save(&state).unwrap();

        let loaded = store.load("alice").unwrap().unwrap();
        assert_eq!(loaded, state);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn rejects_invalid_account() {
        let store = MemoryStore::new();
        let result = store.save(&AccountState::new("../x"));
        assert!(matches!(result, Err(StoreError::InvalidAccount(_))));
    }

    #[test]
    fn accounts_are_sorted() {
        let store = MemoryStore::new();
        store.save(&AccountState::new("zed")).unwrap();
        store.save(&AccountState::new("amy")).unwrap();
        assert_eq!(store.accounts().unwrap(), vec!["amy", "zed"]);
    }
}
