//! Per-pass sync state and engine status.

use marksync_protocol::{LocalManifest, RemoteManifest, UpdateMeta};
use marksync_store::AccountState;
use std::time::{Duration, Instant};

/// The current status of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    /// Engine is idle, not syncing.
    Idle,
    /// Engine is asking the remote whether anything changed.
    CheckingRemote,
    /// Engine is fetching the remote manifest and computing a plan.
    Diffing,
    /// Engine is resolving and applying operations.
    Applying,
    /// Engine has completed a pass.
    Synced,
    /// The last pass ended early or failed.
    Error,
}

impl EngineStatus {
    /// Returns true if a pass is running.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            EngineStatus::CheckingRemote | EngineStatus::Diffing | EngineStatus::Applying
        )
    }

    /// Returns true if the engine can start a new pass.
    pub fn can_start_pass(&self) -> bool {
        !self.is_active()
    }
}

/// Statistics accumulated across passes.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Passes that ran their plan to the end.
    pub passes_completed: u64,
    /// Passes skipped because nothing changed.
    pub passes_skipped: u64,
    /// Passes that ended early.
    pub passes_aborted: u64,
    /// Operations handed to the record builder and kept.
    pub operations_applied: u64,
    /// Operations whose record construction failed.
    pub operations_rejected: u64,
    /// Retried metadata or manifest fetches.
    pub retries: u64,
    /// End of the last pass that ran its plan to the end.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Everything one pass knows about an account.
///
/// Built from the stored [`AccountState`] at the start of a pass and turned
/// back into one at the end.
#[derive(Debug, Clone)]
pub struct SyncState {
    account: String,
    last_sync_ms: Option<u64>,
    remote_meta: Option<UpdateMeta>,
    local: LocalManifest,
    remote: Option<RemoteManifest>,
}

impl SyncState {
    /// Creates the state of an account that never synced.
    pub fn new(account: impl Into<String>) -> Self {
        Self::from_stored(AccountState::new(account))
    }

    /// Restores state from the store.
    pub fn from_stored(stored: AccountState) -> Self {
        Self {
            account: stored.account,
            last_sync_ms: stored.last_sync_ms,
            remote_meta: None,
            local: stored.manifest,
            remote: None,
        }
    }

    /// Returns the account identity.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Returns the remote update marker of the last fully drained pass.
    pub fn last_sync_ms(&self) -> Option<u64> {
        self.last_sync_ms
    }

    /// Returns the authoritative local manifest.
    pub fn local(&self) -> &LocalManifest {
        &self.local
    }

    /// Returns the update metadata fetched for this pass.
    pub fn remote_meta(&self) -> Option<&UpdateMeta> {
        self.remote_meta.as_ref()
    }

    /// Returns the remote manifest fetched for this pass.
    pub fn remote(&self) -> Option<&RemoteManifest> {
        self.remote.as_ref()
    }

    /// Records the update metadata fetched for this pass.
    pub fn set_remote_meta(&mut self, meta: UpdateMeta) {
        self.remote_meta = Some(meta);
    }

    /// Records the remote manifest fetched for this pass.
    pub fn set_remote_manifest(&mut self, remote: RemoteManifest) {
        self.remote = Some(remote);
    }

    /// Decides whether a pass is warranted.
    ///
    /// True if the account never completed a pass, if the remote changed
    /// after the stored marker, or if any local entry is older than
    /// `max_age`.
    pub fn should_sync(&self, now_ms: u64, max_age: Duration) -> bool {
        let Some(marker) = self.last_sync_ms else {
            return true;
        };
        if self
            .remote_meta
            .as_ref()
            .is_some_and(|meta| meta.changed_since(marker))
        {
            return true;
        }
        self.local.has_expired(now_ms, max_age)
    }

    /// Returns a copy of the local manifest for the differ to consume.
    pub fn working_copy(&self) -> LocalManifest {
        self.local.clone()
    }

    /// Moves the local manifest out for mutation during the pass.
    pub fn take_local(&mut self) -> LocalManifest {
        std::mem::take(&mut self.local)
    }

    /// Puts the mutated local manifest back.
    pub fn replace_local(&mut self, local: LocalManifest) {
        self.local = local;
    }

    /// Advances the marker to the update time fetched for this pass.
    ///
    /// Only call this once the plan fully drained.
    pub fn mark_synced(&mut self) {
        if let Some(meta) = &self.remote_meta {
            self.last_sync_ms = Some(meta.last_update_ms);
        }
    }

    /// Returns the part of the state that outlives the pass.
    pub fn to_stored(&self) -> AccountState {
        AccountState {
            account: self.account.clone(),
            last_sync_ms: self.last_sync_ms,
            manifest: self.local.clone(),
        }
    }

    /// Consumes the state, returning the part that outlives the pass.
    pub fn into_stored(self) -> AccountState {
        AccountState {
            account: self.account,
            last_sync_ms: self.last_sync_ms,
            manifest: self.local,
        }
    }
}
