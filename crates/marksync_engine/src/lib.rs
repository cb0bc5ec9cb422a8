//! # marksync engine
//!
//! Incremental bookmark synchronization against a remote collection.
//!
//! This crate provides:
//! - Manifest diffing (add, update, remove planning)
//! - Batched, rate-limited record resolution
//! - A pull-based operation generator with a one-shot completion signal
//! - Local manifest bookkeeping with undo on build failure
//! - An HTTP remote source over a pluggable client
//! - A sync engine tying these to a [`marksync_store::ManifestStore`]
//!
//! ## Architecture
//!
//! A pass runs **check, diff, pull**:
//! 1. Fetch the cheap update metadata and skip the pass if nothing changed
//! 2. Fetch the remote manifest and diff it against the local one
//! 3. Pull operations one at a time; records are fetched in batches of at
//!    most [`MAX_BATCH_SIZE`] keys, one rate-limited call per batch
//!
//! ## Key Invariants
//!
//! - Every handed-out operation is already applied to the local manifest
//! - Remote unavailability ends the plan cleanly; nothing else does
//! - The completion signal fires exactly once per plan
//! - The last-sync marker only advances after a clean, fully drained plan

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod differ;
mod engine;
mod error;
mod generator;
mod http;
mod rate_limiter;
mod resolver;
mod source;
mod state;
mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{RetryConfig, SyncConfig, DEFAULT_MIN_REQUEST_INTERVAL, MAX_BATCH_SIZE};
pub use differ::{ManifestDiffer, PlanCounts, SyncPlan};
pub use engine::{PassOutcome, PassReport, RecordBuilder, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use generator::{GeneratorState, PlanCompletion, SyncOperationGenerator};
pub use http::{HttpClient, HttpDataSource, HttpResponse};
pub use rate_limiter::RateLimiter;
pub use resolver::{BatchResolver, ResolvedBatch};
pub use source::{MemorySource, RemoteDataSource, RemoteSnapshot};
pub use state::{EngineStatus, SyncState, SyncStats};
pub use tracker::{AppliedChange, ManifestChangeTracker};
