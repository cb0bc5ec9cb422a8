//! # marksync store
//!
//! Persistence of per-account sync state.
//!
//! The sync core only needs a load/save contract keyed by account identity;
//! the on-disk format is private to each store.
//!
//! ## Available Stores
//!
//! - [`MemoryStore`] - For testing and one-shot runs
//! - [`FileStore`] - One CBOR file per account under a locked directory
//!
//! ## Example
//!
//! ```rust
//! use marksync_store::{AccountState, ManifestStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! store.save(&AccountState::new("alice")).unwrap();
//! assert!(store.load("alice").unwrap().is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod store;

pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::{validate_account, AccountState, ManifestStore};
