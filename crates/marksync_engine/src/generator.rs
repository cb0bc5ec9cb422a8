//! Pull-based iteration over a sync plan.
//!
//! The generator hands out resolved operations one at a time. When nothing
//! resolved is left it fetches the next batch and returns `None` for that
//! call, so a single pull never blocks on more than one remote round-trip.
//!
//! ```text
//!            has_next() == false                 has_next()
//!  Active ─────────────────────────────┐  ┌──────────────────┐
//!    │ remote unavailable              ▼  │                  ▼
//!    └──────────────────────► Draining ──────────────► Exhausted
//! ```

use crate::differ::{PlanCounts, SyncPlan};
use crate::resolver::BatchResolver;
use crate::source::RemoteDataSource;
use crate::tracker::{AppliedChange, ManifestChangeTracker};
use marksync_protocol::{Action, LocalManifest, Operation};

/// Lifecycle of a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// Operations are being handed out.
    Active,
    /// The remote became unavailable; the plan was dropped.
    Draining,
    /// Terminal. The completion notification has fired.
    Exhausted,
}

/// Summary delivered once, when the generator is exhausted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanCompletion {
    /// True if the plan ran out normally; false if the remote became
    /// unavailable part way through.
    pub drained: bool,
    /// Operations handed out and still applied, by action.
    pub applied: PlanCounts,
    /// Operations handed out and later rejected.
    pub rejected: usize,
    /// Keys that could not be resolved (missing from responses or in a
    /// failed batch).
    pub unresolved: usize,
    /// Returned records that matched no pending action.
    pub stale: usize,
    /// Operations dropped when the remote became unavailable.
    pub abandoned: usize,
    /// Number of record fetches issued.
    pub batches: usize,
}

impl PlanCompletion {
    /// Returns the number of operations handed out and still applied.
    #[must_use]
    pub fn yielded(&self) -> usize {
        self.applied.total()
    }

    /// Returns the number of planned operations that never reached the
    /// caller.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.unresolved + self.abandoned
    }

    /// Returns true if the plan ran out with every operation kept.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.drained && self.dropped() == 0 && self.rejected == 0
    }
}

type CompletionListener<'a> = Box<dyn FnMut(&PlanCompletion) + 'a>;

/// Hands out the operations of a plan, applying each to the local manifest.
pub struct SyncOperationGenerator<'a, S: RemoteDataSource + ?Sized> {
    plan: SyncPlan,
    resolver: BatchResolver<'a, S>,
    tracker: ManifestChangeTracker<'a>,
    state: GeneratorState,
    summary: PlanCompletion,
    last_applied: Option<(Action, AppliedChange)>,
    listeners: Vec<CompletionListener<'a>>,
}

impl<'a, S: RemoteDataSource + ?Sized> SyncOperationGenerator<'a, S> {
    /// Creates a generator over `plan`.
    pub fn new(
        plan: SyncPlan,
        resolver: BatchResolver<'a, S>,
        tracker: ManifestChangeTracker<'a>,
    ) -> Self {
        Self {
            plan,
            resolver,
            tracker,
            state: GeneratorState::Active,
            summary: PlanCompletion::default(),
            last_applied: None,
            listeners: Vec::new(),
        }
    }

    /// Registers a listener for the completion notification.
    ///
    /// Listeners registered after exhaustion are never called.
    pub fn on_complete(&mut self, listener: impl FnMut(&PlanCompletion) + 'a) {
        self.listeners.push(Box::new(listener));
    }

    /// Returns the current state.
    pub fn state(&self) -> GeneratorState {
        self.state
    }

    /// Returns the local manifest as mutated so far.
    pub fn manifest(&self) -> &LocalManifest {
        self.tracker.manifest()
    }

    /// Returns the completion summary once exhausted.
    pub fn completion(&self) -> Option<&PlanCompletion> {
        (self.state == GeneratorState::Exhausted).then_some(&self.summary)
    }

    /// Consumes the generator, returning the mutated manifest and the
    /// summary so far.
    pub fn finish(self) -> (LocalManifest, PlanCompletion) {
        (self.tracker.into_manifest(), self.summary)
    }

    /// Returns true while ready or pending operations remain.
    ///
    /// The first call that returns false fires the completion notification;
    /// later calls return false without firing it again.
    pub fn has_next(&mut self) -> bool {
        match self.state {
            GeneratorState::Active if !self.plan.is_empty() => true,
            GeneratorState::Exhausted => false,
            GeneratorState::Active | GeneratorState::Draining => {
                self.exhaust();
                false
            }
        }
    }

    /// Returns the next resolved operation, or `None` to mean "poll again".
    ///
    /// When no resolved operation is waiting, this fetches the next batch
    /// and returns `None`; its operations are handed out by later calls.
    /// The returned operation has already been applied to the manifest.
    pub fn try_next(&mut self) -> Option<Operation> {
        if self.state != GeneratorState::Active {
            return None;
        }

        if let Some(operation) = self.plan.pop_ready() {
            let change = self.tracker.apply(&operation);
            bump(&mut self.summary.applied, operation.action, 1);
            self.last_applied = Some((operation.action, change));
            return Some(operation);
        }

        if self.plan.pending_len() > 0 {
            self.advance_batch();
        }
        None
    }

    /// Undoes the manifest effect of the operation last returned by
    /// [`Self::try_next`].
    ///
    /// Returns false if there is nothing to undo.
    pub fn reject_last(&mut self) -> bool {
        match self.last_applied.take() {
            Some((action, change)) => {
                self.tracker.revert(change);
                bump(&mut self.summary.applied, action, -1);
                self.summary.rejected += 1;
                true
            }
            None => false,
        }
    }

    fn advance_batch(&mut self) {
        let partials = self.plan.take_pending(self.resolver.batch_size());
        let requested = partials.len();
        self.summary.batches += 1;

        match self.resolver.resolve_next_batch(partials) {
            Ok(batch) => {
                self.summary.unresolved += batch.unresolved.len();
                self.summary.stale += batch.stale.len();
                self.plan.push_ready(batch.operations);
            }
            Err(e) => {
                let abandoned = requested + self.plan.clear();
                tracing::warn!(
                    error = %e,
                    abandoned,
                    "remote unavailable, ending pass early"
                );
                self.summary.abandoned += abandoned;
                self.state = GeneratorState::Draining;
            }
        }
    }

    fn exhaust(&mut self) {
        self.summary.drained = self.state == GeneratorState::Active;
        self.state = GeneratorState::Exhausted;

        tracing::debug!(
            drained = self.summary.drained,
            yielded = self.summary.yielded(),
            batches = self.summary.batches,
            "operation sequence exhausted"
        );
        for listener in &mut self.listeners {
            listener(&self.summary);
        }
    }
}

fn bump(counts: &mut PlanCounts, action: Action, delta: isize) {
    let slot = match action {
        Action::Add => &mut counts.adds,
        Action::Update => &mut counts.updates,
        Action::Remove => &mut counts.removes,
    };
    *slot = slot.saturating_add_signed(delta);
}
