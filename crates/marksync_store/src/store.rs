//! Store trait and persisted account state.

use crate::error::{StoreError, StoreResult};
use marksync_protocol::LocalManifest;
use serde::{Deserialize, Serialize};

/// Everything persisted for one account between sync passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Account identity.
    pub account: String,
    /// Remote update marker of the last fully drained pass.
    pub last_sync_ms: Option<u64>,
    /// Authoritative local manifest.
    pub manifest: LocalManifest,
}

impl AccountState {
    /// Creates the state of an account that never synced.
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            last_sync_ms: None,
            manifest: LocalManifest::new(),
        }
    }
}

/// Load/save contract for account state.
///
/// # Invariants
///
/// - `load` after a successful `save` returns the saved state
/// - `load` of an account that was never saved returns `None`
/// - Stores must be `Send + Sync` so an engine can be shared across threads
///
/// # Implementors
///
/// - [`super::MemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent storage
pub trait ManifestStore: Send + Sync {
    /// Loads the state of `account`, if any was saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the account name is invalid or the stored state
    /// cannot be read.
    fn load(&self, account: &str) -> StoreResult<Option<AccountState>>;

    /// Saves `state`, replacing any previous state of the same account.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be written.
    fn save(&self, state: &AccountState) -> StoreResult<()>;

    /// Lists the accounts with saved state, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be enumerated.
    fn accounts(&self) -> StoreResult<Vec<String>>;
}

/// Checks that `account` is non-empty and made of `[A-Za-z0-9._-]`.
///
/// # Errors
///
/// Returns [`StoreError::InvalidAccount`] otherwise.
pub fn validate_account(account: &str) -> StoreResult<()> {
    let valid = !account.is_empty()
        && !account.starts_with('.')
        && account
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidAccount(account.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_names() {
        assert!(validate_account("alice").is_ok());
        assert!(validate_account("team-1.backup_2").is_ok());

        assert!(validate_account("").is_err());
        assert!(validate_account("../etc").is_err());
        assert!(validate_account(".hidden").is_err());
        assert!(validate_account("a b").is_err());
    }

    #[test]
    fn new_state_never_synced() {
        let state = AccountState::new("alice");
        assert_eq!(state.last_sync_ms, None);
        assert!(state.manifest.is_empty());
    }
}
