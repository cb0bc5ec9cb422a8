//! Batch resolution of partial operations.

use crate::error::SyncResult;
use crate::rate_limiter::RateLimiter;
use crate::source::RemoteDataSource;
use marksync_protocol::{Action, Key, Operation, PartialOperation};
use std::collections::HashMap;

/// Outcome of resolving one batch.
#[derive(Debug, Default)]
pub struct ResolvedBatch {
    /// Operations paired with their fetched records, in response order.
    pub operations: Vec<Operation>,
    /// Keys requested but not resolved, in request order.
    pub unresolved: Vec<Key>,
    /// Keys of returned records that matched no pending action.
    pub stale: Vec<Key>,
    /// True if the fetch itself failed (every key is then unresolved).
    pub fetch_failed: bool,
}

/// Turns partial operations into full ones, one remote call per batch.
pub struct BatchResolver<'a, S: RemoteDataSource + ?Sized> {
    source: &'a S,
    limiter: &'a RateLimiter,
    batch_size: usize,
}

impl<'a, S: RemoteDataSource + ?Sized> BatchResolver<'a, S> {
    /// Creates a resolver fetching at most `batch_size` keys per call.
    pub fn new(source: &'a S, limiter: &'a RateLimiter, batch_size: usize) -> Self {
        Self {
            source,
            limiter,
            batch_size: batch_size.max(1),
        }
    }

    /// Returns the maximum number of keys per call.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Resolves one batch of at most `batch_size` partial operations.
    ///
    /// # Errors
    ///
    /// Only [`crate::SyncError::RemoteUnavailable`] is returned, unchanged,
    /// and nothing from the batch is kept. Any other fetch failure resolves
    /// the batch to nothing and is reported through
    /// [`ResolvedBatch::fetch_failed`].
    pub fn resolve_next_batch(&self, partials: Vec<PartialOperation>) -> SyncResult<ResolvedBatch> {
        debug_assert!(partials.len() <= self.batch_size);
        if partials.is_empty() {
            return Ok(ResolvedBatch::default());
        }

        let keys: Vec<Key> = partials.iter().map(|p| p.key.clone()).collect();
        let mut actions: HashMap<Key, Action> = partials
            .into_iter()
            .map(|p| (p.key, p.action))
            .collect();

        self.limiter.wait_for_turn();
        let records = match self.source.fetch_records(&keys) {
            Ok(records) => records,
            Err(e) if e.ends_pass() => return Err(e),
            Err(e) => {
                tracing::warn!(keys = keys.len(), error = %e, "batch fetch failed, skipping batch");
                return Ok(ResolvedBatch {
                    unresolved: keys,
                    fetch_failed: true,
                    ..ResolvedBatch::default()
                });
            }
        };

        let mut batch = ResolvedBatch::default();
        for record in records {
            match actions.remove(&record.key) {
                Some(action) => batch.operations.push(Operation::new(action, record)),
                None => {
                    tracing::warn!(key = %record.key, "fetched record matches no pending action, dropping");
                    batch.stale.push(record.key);
                }
            }
        }

        batch.unresolved = keys
            .into_iter()
            .filter(|k| actions.contains_key(k))
            .collect();
        if !batch.unresolved.is_empty() {
            tracing::warn!(
                count = batch.unresolved.len(),
                "records missing from batch response, dropped for this pass"
            );
        }

        tracing::debug!(
            resolved = batch.operations.len(),
            unresolved = batch.unresolved.len(),
            stale = batch.stale.len(),
            "resolved batch"
        );
        Ok(batch)
    }
}
