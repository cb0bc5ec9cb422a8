//! Manifest diffing.
//!
//! Compares the local manifest against the remote one and produces a
//! [`SyncPlan`]: Add/Update partial operations in remote order, waiting for
//! their records, plus Remove operations that are complete from the start.

use marksync_protocol::{LocalManifest, Operation, PartialOperation, RemoteManifest};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;

/// Number of operations of each kind in a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanCounts {
    /// Keys only present remotely.
    pub adds: usize,
    /// Keys present on both sides whose hash changed or whose local copy expired.
    pub updates: usize,
    /// Keys only present locally.
    pub removes: usize,
}

impl PlanCounts {
    /// Returns the total number of operations.
    #[must_use]
    pub fn total(&self) -> usize {
        self.adds + self.updates + self.removes
    }
}

/// The operations one pass has to perform.
///
/// Holds two queues: `ready` operations need no remote fetch and are
/// consumed first; `pending` partial operations are resolved in batches.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    pending: VecDeque<PartialOperation>,
    ready: VecDeque<Operation>,
    counts: PlanCounts,
}

impl SyncPlan {
    /// Returns the counts computed when the plan was built.
    #[must_use]
    pub fn counts(&self) -> PlanCounts {
        self.counts
    }

    /// Returns the number of partial operations awaiting resolution.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns the number of operations ready to be consumed.
    #[must_use]
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Returns true if nothing is left, pending or ready.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.ready.is_empty()
    }

    /// Iterates over partial operations awaiting resolution, in order.
    pub fn pending(&self) -> impl Iterator<Item = &PartialOperation> {
        self.pending.iter()
    }

    /// Iterates over ready operations, in order.
    pub fn ready(&self) -> impl Iterator<Item = &Operation> {
        self.ready.iter()
    }

    pub(crate) fn pop_ready(&mut self) -> Option<Operation> {
        self.ready.pop_front()
    }

    pub(crate) fn push_ready(&mut self, operations: impl IntoIterator<Item = Operation>) {
        self.ready.extend(operations);
    }

    /// Takes up to `limit` partial operations off the front of the queue.
    pub(crate) fn take_pending(&mut self, limit: usize) -> Vec<PartialOperation> {
        let n = limit.min(self.pending.len());
        self.pending.drain(..n).collect()
    }

    /// Drops everything left in both queues, returning how many were dropped.
    pub(crate) fn clear(&mut self) -> usize {
        let dropped = self.pending.len() + self.ready.len();
        self.pending.clear();
        self.ready.clear();
        dropped
    }
}

/// Computes sync plans.
#[derive(Debug, Clone, Copy)]
pub struct ManifestDiffer {
    now_ms: u64,
    max_age: Duration,
}

impl ManifestDiffer {
    /// Creates a differ that judges expiry at `now_ms` against `max_age`.
    #[must_use]
    pub fn new(now_ms: u64, max_age: Duration) -> Self {
        Self { now_ms, max_age }
    }

    /// Diffs `working` against `remote`.
    ///
    /// `working` is a copy of the authoritative local manifest and is
    /// consumed: every key seen remotely is struck from it, and whatever is
    /// left becomes a Remove.
    pub fn diff(&self, mut working: LocalManifest, remote: &RemoteManifest) -> SyncPlan {
        let mut plan = SyncPlan::default();
        let mut seen = HashSet::with_capacity(remote.len());

        for entry in remote {
            if !seen.insert(entry.key.clone()) {
                tracing::warn!(key = %entry.key, "duplicate key in remote manifest, ignoring");
                continue;
            }

            match working.remove(entry.key.as_str()) {
                None => {
                    plan.pending.push_back(PartialOperation::add(entry.key.clone()));
                    plan.counts.adds += 1;
                }
                Some(local)
                    if local.content_hash != entry.content_hash
                        || local.is_expired(self.now_ms, self.max_age) =>
                {
                    plan.pending
                        .push_back(PartialOperation::update(entry.key.clone()));
                    plan.counts.updates += 1;
                }
                Some(_) => {}
            }
        }

        for local in working {
            plan.ready.push_back(Operation::remove(&local));
            plan.counts.removes += 1;
        }

        tracing::debug!(
            adds = plan.counts.adds,
            updates = plan.counts.updates,
            removes = plan.counts.removes,
            "computed sync plan"
        );
        plan
    }
}
