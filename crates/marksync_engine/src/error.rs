//! Error types for the sync engine.

use marksync_protocol::Key;
use marksync_store::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during a sync pass.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote source is overloaded or down. Ends the pass; retried on
    /// the next scheduled pass.
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// A fetch failed for a reason other than availability.
    #[error("transient fetch failure: {0}")]
    TransientFetch(String),

    /// The remote returned something that could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Record construction failed for one operation.
    #[error("record build failed for {key}: {message}")]
    RecordBuild {
        /// Key of the affected bookmark.
        key: Key,
        /// Error message from the builder.
        message: String,
    },

    /// Loading or saving account state failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A pass is already running on this engine.
    #[error("a sync pass is already running for account {0}")]
    PassInProgress(String),

    /// The configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SyncError {
    /// Creates an unavailability error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::RemoteUnavailable(message.into())
    }

    /// Creates a transient fetch error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientFetch(message.into())
    }

    /// Returns true if this error stops the current pass without retries.
    pub fn ends_pass(&self) -> bool {
        matches!(self, SyncError::RemoteUnavailable(_))
    }

    /// Returns true if the failed call may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::TransientFetch(_) | SyncError::Protocol(_))
    }
}
