//! # marksync protocol
//!
//! Data types shared by every marksync crate.
//!
//! This crate provides:
//! - [`Key`] for content-identity hashes
//! - Local and remote manifests used to detect change
//! - Partial and resolved sync operations
//! - [`BookmarkRecord`], the full record fetched from the remote collection
//! - [`UpdateMeta`], the remote "last changed" marker
//!
//! This is a pure data crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod key;
mod manifest;
mod meta;
mod operation;
mod record;

pub use key::Key;
pub use manifest::{
    LocalManifest, LocalManifestEntry, RemoteManifest, RemoteManifestEntry, DEFAULT_MAX_AGE,
};
pub use meta::UpdateMeta;
pub use operation::{Action, Operation, PartialOperation};
pub use record::BookmarkRecord;
