//! # marksync testkit
//!
//! Test utilities for marksync.
//!
//! This crate provides:
//! - Record, entry and configuration helpers
//! - A scripted remote source that fails chosen calls
//! - A recording record builder and a store whose saves can fail
//! - Property-based generators for local/remote manifest pairs
//!
//! ## Usage
//!
//! ```rust,ignore
//! use marksync_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_store() {
//!     with_file_store(|store, _dir| {
//!         let engine = SyncEngine::new(fast_config("alice"), source, store).unwrap();
//!         // ... test operations
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
