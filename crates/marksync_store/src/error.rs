//! Error types for store operations.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while loading or saving account state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Another process holds the store directory.
    #[error("store directory is locked by another process: {0}")]
    Locked(String),

    /// The account name cannot be used as a storage key.
    #[error("invalid account name: {0:?}")]
    InvalidAccount(String),

    /// Stored state could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// Stored state could not be decoded.
    #[error("stored state corrupted: {0}")]
    Corrupted(String),
}
