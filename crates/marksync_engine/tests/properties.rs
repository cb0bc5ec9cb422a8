//! Property tests for diffing and full passes.

use marksync_engine::{
    BatchResolver, ManifestChangeTracker, ManifestDiffer, ManualClock, MemorySource, PassOutcome,
    RateLimiter, RemoteDataSource, SyncEngine, SyncOperationGenerator, MAX_BATCH_SIZE,
};
use marksync_protocol::{Action, LocalManifest};
use marksync_store::{AccountState, ManifestStore, MemoryStore};
use marksync_testkit::prelude::*;
use proptest::prelude::*;
use std::cell::Cell;
use std::sync::Arc;
use std::time::Duration;

fn engine_for(scenario: &SyncScenario) -> SyncEngine<MemorySource, MemoryStore> {
    let store = MemoryStore::with_state(AccountState {
        account: "prop".into(),
        last_sync_ms: Some(1),
        manifest: scenario.local.clone(),
    });
    SyncEngine::new(
        fast_config("prop")
            .with_max_entry_age(SCENARIO_MAX_AGE),
        MemorySource::with_records(2, scenario.remote.clone()),
        store,
    )
    .unwrap()
    .with_clock(Arc::new(ManualClock::new(SCENARIO_NOW_MS)))
}

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn plan_size_matches_placements(scenario in scenario_strategy(60)) {
        let source = MemorySource::with_records(1, scenario.remote.clone());
        let plan = ManifestDiffer::new(SCENARIO_NOW_MS, SCENARIO_MAX_AGE)
            .diff(scenario.local.clone(), &source.fetch_manifest().unwrap());

        let counts = plan.counts();
        prop_assert_eq!(counts.adds, scenario.count(KeyPlacement::RemoteOnly));
        prop_assert_eq!(
            counts.updates,
            scenario.count(KeyPlacement::Changed) + scenario.count(KeyPlacement::Expired)
        );
        prop_assert_eq!(counts.removes, scenario.count(KeyPlacement::LocalOnly));
        prop_assert_eq!(counts.total(), scenario.expected_operations());
        prop_assert_eq!(plan.pending_len(), scenario.expected_fetches());
    }

    #[test]
    fn full_pass_mirrors_remote(scenario in scenario_strategy(60)) {
        let engine = engine_for(&scenario);
        let mut builder = RecordingBuilder::new();
        let report = engine.run_pass(&mut builder).unwrap();

        prop_assert_eq!(builder.operations.len(), scenario.expected_operations());

        let stored = engine.store().load("prop").unwrap().unwrap();
        prop_assert_eq!(stored.manifest.len(), scenario.remote.len());
        for record in &scenario.remote {
            let local = stored.manifest.get(record.key.as_str());
            prop_assert!(local.is_some());
            prop_assert_eq!(&local.unwrap().content_hash, &record.content_hash);
        }
        if scenario.expected_operations() > 0 {
            prop_assert_eq!(report.outcome, PassOutcome::Completed);
        }
    }

    #[test]
    fn second_pass_is_empty(scenario in scenario_strategy(60)) {
        let engine = engine_for(&scenario);
        engine.run_pass(&mut RecordingBuilder::new()).unwrap();

        engine.source().set_update_time(3);
        let mut builder = RecordingBuilder::new();
        engine.run_pass(&mut builder).unwrap();
        prop_assert!(builder.operations.is_empty());
    }

    #[test]
    fn batches_are_capped(count in 0usize..100) {
        let source = MemorySource::with_records(1, numbered_records(count, "h"));
        let limiter = RateLimiter::new(Duration::ZERO);
        let clock = ManualClock::new(SCENARIO_NOW_MS);
        let plan = ManifestDiffer::new(SCENARIO_NOW_MS, SCENARIO_MAX_AGE)
            .diff(LocalManifest::new(), &source.fetch_manifest().unwrap());

        let mut generator = SyncOperationGenerator::new(
            plan,
            BatchResolver::new(&source, &limiter, MAX_BATCH_SIZE),
            ManifestChangeTracker::new(LocalManifest::new(), &clock),
        );
        let mut yielded = 0;
        while generator.has_next() {
            if let Some(op) = generator.try_next() {
                prop_assert_eq!(op.action, Action::Add);
                yielded += 1;
            }
        }

        let calls = source.record_calls();
        prop_assert_eq!(yielded, count);
        prop_assert_eq!(calls.len(), count.div_ceil(MAX_BATCH_SIZE));
        prop_assert!(calls.iter().all(|c| !c.is_empty() && c.len() <= MAX_BATCH_SIZE));
    }

    #[test]
    fn completion_fires_once_under_polling(count in 0usize..50, extra_polls in 1usize..10) {
        let source = MemorySource::with_records(1, numbered_records(count, "h"));
        let limiter = RateLimiter::new(Duration::ZERO);
        let clock = ManualClock::new(SCENARIO_NOW_MS);
        let fired = Cell::new(0);
        let plan = ManifestDiffer::new(SCENARIO_NOW_MS, SCENARIO_MAX_AGE)
            .diff(LocalManifest::new(), &source.fetch_manifest().unwrap());

        let mut generator = SyncOperationGenerator::new(
            plan,
            BatchResolver::new(&source, &limiter, MAX_BATCH_SIZE),
            ManifestChangeTracker::new(LocalManifest::new(), &clock),
        );
        generator.on_complete(|_| fired.set(fired.get() + 1));

        while generator.has_next() {
            generator.try_next();
        }
        for _ in 0..extra_polls {
            prop_assert!(!generator.has_next());
        }
        drop(generator);
        prop_assert_eq!(fired.get(), 1);
    }
}
