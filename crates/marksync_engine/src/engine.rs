//! The sync engine.
//!
//! One engine drives passes for one account. A pass:
//!
//! 1. loads the account state from the store
//! 2. fetches the remote update metadata and decides whether to sync
//! 3. fetches the remote manifest and diffs it against the local one
//! 4. pulls operations out of the generator, handing each to a
//!    [`RecordBuilder`]
//! 5. saves the state if the plan ran out
//!
//! The last-sync marker only advances when every planned operation was
//! kept, so keys dropped for this pass are picked up by the next one.

use crate::clock::{Clock, SystemClock};
use crate::config::SyncConfig;
use crate::differ::{ManifestDiffer, PlanCounts};
use crate::error::{SyncError, SyncResult};
use crate::generator::{PlanCompletion, SyncOperationGenerator};
use crate::rate_limiter::RateLimiter;
use crate::resolver::BatchResolver;
use crate::source::RemoteDataSource;
use crate::state::{EngineStatus, SyncState, SyncStats};
use crate::tracker::ManifestChangeTracker;
use marksync_protocol::Operation;
use marksync_store::{AccountState, ManifestStore};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Builds whatever the host keeps per bookmark (search index entries,
/// cached pages) from a resolved operation.
///
/// A failure affects only that operation: its manifest change is reverted
/// and the pass continues.
pub trait RecordBuilder {
    /// Handles one operation.
    ///
    /// # Errors
    ///
    /// Any error rejects the operation.
    fn build(&mut self, operation: &Operation) -> SyncResult<()>;
}

impl<F> RecordBuilder for F
where
    F: FnMut(&Operation) -> SyncResult<()>,
{
    fn build(&mut self, operation: &Operation) -> SyncResult<()> {
        self(operation)
    }
}

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Nothing changed remotely and nothing expired locally.
    Skipped,
    /// The plan ran out.
    Completed,
    /// The remote became unavailable before the plan ran out.
    Aborted,
}

/// Result of one pass.
#[derive(Debug, Clone)]
pub struct PassReport {
    /// How the pass ended.
    pub outcome: PassOutcome,
    /// Operations the diff planned.
    pub planned: PlanCounts,
    /// Operations built and kept, by action.
    pub applied: PlanCounts,
    /// Operations whose record construction failed.
    pub rejected: usize,
    /// Planned operations that never reached the builder.
    pub dropped: usize,
    /// Record fetches issued.
    pub batches: usize,
    /// Whether the account state was saved.
    pub persisted: bool,
    /// Whether the last-sync marker moved forward.
    pub marker_advanced: bool,
    /// Wall time of the pass.
    pub duration: Duration,
}

impl PassReport {
    fn empty(outcome: PassOutcome, duration: Duration) -> Self {
        Self {
            outcome,
            planned: PlanCounts::default(),
            applied: PlanCounts::default(),
            rejected: 0,
            dropped: 0,
            batches: 0,
            persisted: false,
            marker_advanced: false,
            duration,
        }
    }
}

type CompletionHook = Arc<dyn Fn(&PlanCompletion) + Send + Sync>;

/// Clears the in-pass flag when a pass ends, however it ends.
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives sync passes for one account.
pub struct SyncEngine<S: RemoteDataSource, P: ManifestStore> {
    config: SyncConfig,
    source: Arc<S>,
    store: Arc<P>,
    limiter: RateLimiter,
    clock: Arc<dyn Clock>,
    status: RwLock<EngineStatus>,
    stats: RwLock<SyncStats>,
    completion_hook: RwLock<Option<CompletionHook>>,
    in_pass: AtomicBool,
}

impl<S: RemoteDataSource, P: ManifestStore> SyncEngine<S, P> {
    /// Creates a new engine.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: SyncConfig, source: S, store: P) -> SyncResult<Self> {
        Self::with_shared(config, Arc::new(source), Arc::new(store))
    }

    /// Creates an engine over a source and store shared with the caller.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] if `config` does not validate.
    pub fn with_shared(config: SyncConfig, source: Arc<S>, store: Arc<P>) -> SyncResult<Self> {
        config.validate()?;
        marksync_store::validate_account(&config.account)
            .map_err(|e| SyncError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            limiter: RateLimiter::new(config.min_request_interval),
            config,
            source,
            store,
            clock: Arc::new(SystemClock),
            status: RwLock::new(EngineStatus::Idle),
            stats: RwLock::new(SyncStats::default()),
            completion_hook: RwLock::new(None),
            in_pass: AtomicBool::new(false),
        })
    }

    /// Replaces the clock used for expiry and indexing timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the remote source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns the store.
    pub fn store(&self) -> &P {
        &self.store
    }

    /// Gets the current status.
    pub fn status(&self) -> EngineStatus {
        *self.status.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Sets a hook fired once per pass, when the operation sequence is
    /// exhausted.
    pub fn set_completion_hook(&self, hook: impl Fn(&PlanCompletion) + Send + Sync + 'static) {
        *self.completion_hook.write() = Some(Arc::new(hook));
    }

    /// Removes the completion hook.
    pub fn clear_completion_hook(&self) {
        *self.completion_hook.write() = None;
    }

    fn set_status(&self, status: EngineStatus) {
        *self.status.write() = status;
    }

    /// Runs one pass, handing every resolved operation to `builder`.
    ///
    /// Remote unavailability is not an error: the pass ends early and the
    /// report says [`PassOutcome::Aborted`].
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::PassInProgress`] if another pass is running on
    /// this engine, a store error if the state cannot be loaded, or the
    /// last fetch error once retries of the metadata or manifest fetch are
    /// used up.
    pub fn run_pass<B: RecordBuilder + ?Sized>(&self, builder: &mut B) -> SyncResult<PassReport> {
        if self
            .in_pass
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SyncError::PassInProgress(self.config.account.clone()));
        }
        let _guard = PassGuard(&self.in_pass);

        let start = Instant::now();
        let result = self.pass(builder, start);

        match &result {
            Ok(report) => self.record_report(report),
            Err(e) => self.handle_error(e),
        }
        result
    }

    fn pass<B: RecordBuilder + ?Sized>(
        &self,
        builder: &mut B,
        start: Instant,
    ) -> SyncResult<PassReport> {
        let account = self.config.account.as_str();

        self.set_status(EngineStatus::CheckingRemote);
        let stored = self
            .store
            .load(account)?
            .unwrap_or_else(|| AccountState::new(account));
        let mut state = SyncState::from_stored(stored);

        let meta = match self.fetch_with_retry("update metadata", || {
            self.source.fetch_update_meta()
        }) {
            Ok(meta) => meta,
            Err(e) if e.ends_pass() => return Ok(self.aborted_early(&e, start)),
            Err(e) => return Err(e),
        };
        state.set_remote_meta(meta);

        let now_ms = self.clock.now_ms();
        if !state.should_sync(now_ms, self.config.max_entry_age) {
            tracing::info!(account, "remote unchanged and nothing expired, skipping pass");
            return Ok(PassReport::empty(PassOutcome::Skipped, start.elapsed()));
        }

        self.set_status(EngineStatus::Diffing);
        let remote = match self.fetch_with_retry("manifest", || self.source.fetch_manifest()) {
            Ok(remote) => remote,
            Err(e) if e.ends_pass() => return Ok(self.aborted_early(&e, start)),
            Err(e) => return Err(e),
        };
        let plan = ManifestDiffer::new(now_ms, self.config.max_entry_age)
            .diff(state.working_copy(), &remote);
        state.set_remote_manifest(remote);

        let planned = plan.counts();
        tracing::info!(
            account,
            adds = planned.adds,
            updates = planned.updates,
            removes = planned.removes,
            "starting sync pass"
        );

        self.set_status(EngineStatus::Applying);
        let mut generator = SyncOperationGenerator::new(
            plan,
            BatchResolver::new(self.source.as_ref(), &self.limiter, self.config.batch_size),
            ManifestChangeTracker::new(state.take_local(), self.clock.as_ref()),
        );
        if let Some(hook) = self.completion_hook.read().clone() {
            generator.on_complete(move |completion| hook(completion));
        }

        while generator.has_next() {
            let Some(operation) = generator.try_next() else {
                continue;
            };
            if let Err(e) = builder.build(&operation) {
                tracing::warn!(
                    key = %operation.key(),
                    action = %operation.action,
                    error = %e,
                    "record build failed, reverting manifest change"
                );
                generator.reject_last();
            }
        }

        let (local, completion) = generator.finish();
        state.replace_local(local);

        let mut report = PassReport {
            outcome: if completion.drained {
                PassOutcome::Completed
            } else {
                PassOutcome::Aborted
            },
            planned,
            applied: completion.applied,
            rejected: completion.rejected,
            dropped: completion.dropped(),
            batches: completion.batches,
            persisted: false,
            marker_advanced: false,
            duration: Duration::ZERO,
        };

        if completion.drained {
            if completion.is_clean() {
                state.mark_synced();
                report.marker_advanced = true;
            }
            match self.store.save(&state.to_stored()) {
                Ok(()) => report.persisted = true,
                Err(e) => {
                    tracing::warn!(account, error = %e, "failed to persist account state");
                    report.marker_advanced = false;
                }
            }
        }

        report.duration = start.elapsed();
        tracing::info!(
            account,
            outcome = ?report.outcome,
            applied = report.applied.total(),
            rejected = report.rejected,
            dropped = report.dropped,
            persisted = report.persisted,
            duration_ms = report.duration.as_millis() as u64,
            "sync pass finished"
        );
        Ok(report)
    }

    /// Issues one rate-limited fetch, retrying retryable failures.
    fn fetch_with_retry<T>(
        &self,
        what: &str,
        mut fetch: impl FnMut() -> SyncResult<T>,
    ) -> SyncResult<T> {
        let retry = &self.config.retry;
        let mut attempt = 0u32;

        loop {
            self.limiter.wait_for_turn();
            match fetch() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt + 1 < retry.max_attempts => {
                    attempt += 1;
                    let delay = retry.delay_for_attempt(attempt);
                    tracing::warn!(what, attempt, ?delay, error = %e, "fetch failed, retrying");
                    self.stats.write().retries += 1;
                    std::thread::sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn aborted_early(&self, error: &SyncError, start: Instant) -> PassReport {
        tracing::warn!(account = %self.config.account, error = %error, "remote unavailable, pass aborted");
        self.stats.write().last_error = Some(error.to_string());
        PassReport::empty(PassOutcome::Aborted, start.elapsed())
    }

    fn record_report(&self, report: &PassReport) {
        let mut stats = self.stats.write();
        match report.outcome {
            PassOutcome::Skipped => stats.passes_skipped += 1,
            PassOutcome::Completed => {
                stats.passes_completed += 1;
                stats.last_sync_time = Some(Instant::now());
                stats.last_error = None;
            }
            PassOutcome::Aborted => stats.passes_aborted += 1,
        }
        stats.operations_applied += report.applied.total() as u64;
        stats.operations_rejected += report.rejected as u64;
        drop(stats);

        self.set_status(match report.outcome {
            PassOutcome::Aborted => EngineStatus::Error,
            PassOutcome::Skipped | PassOutcome::Completed => EngineStatus::Synced,
        });
    }

    /// Handles an error by updating status and stats.
    fn handle_error(&self, error: &SyncError) {
        tracing::warn!(account = %self.config.account, error = %error, "sync pass failed");
        self.set_status(EngineStatus::Error);
        self.stats.write().last_error = Some(error.to_string());
    }
}
