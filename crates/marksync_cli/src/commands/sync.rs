//! Sync command implementation.

use super::{load_snapshot, PassOptions};
use marksync_engine::{MemorySource, PassOutcome, PassReport, SyncEngine, SyncResult};
use marksync_protocol::Operation;
use marksync_store::FileStore;
use serde::Serialize;
use std::path::Path;

/// Outcome of a pass, as printed.
#[derive(Debug, Serialize)]
pub struct SyncSummary {
    /// Account synced.
    pub account: String,
    /// skipped, completed or aborted.
    pub outcome: &'static str,
    /// Operations applied, as `action key`.
    pub operations: Vec<String>,
    /// Operations dropped for this pass.
    pub dropped: usize,
    /// Whether state was saved.
    pub persisted: bool,
    /// Whether the last-sync marker advanced.
    pub marker_advanced: bool,
    /// Wall time in milliseconds.
    pub duration_ms: u64,
}

impl SyncSummary {
    fn new(account: &str, report: &PassReport, operations: Vec<String>) -> Self {
        Self {
            account: account.to_string(),
            outcome: match report.outcome {
                PassOutcome::Skipped => "skipped",
                PassOutcome::Completed => "completed",
                PassOutcome::Aborted => "aborted",
            },
            operations,
            dropped: report.dropped,
            persisted: report.persisted,
            marker_advanced: report.marker_advanced,
            duration_ms: u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Runs the sync command.
pub fn run(
    store_dir: &Path,
    account: &str,
    remote: &Path,
    options: &PassOptions,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(remote)?;
    let store = FileStore::open(store_dir)?;

    let engine = SyncEngine::new(options.config(account), MemorySource::from_snapshot(snapshot), store)?;

    let mut operations = Vec::new();
    let report = engine.run_pass(&mut |op: &Operation| -> SyncResult<()> {
        tracing::debug!(action = %op.action, key = %op.key(), url = %op.record.url, "applying");
        operations.push(format!("{} {}", op.action, op.key()));
        Ok(())
    })?;

    let summary = SyncSummary::new(account, &report, operations);
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        _ => {
            print_text_output(&summary);
        }
    }

    Ok(())
}

fn print_text_output(summary: &SyncSummary) {
    println!("Sync of {}: {}", summary.account, summary.outcome);
    println!("  Operations:      {}", summary.operations.len());
    for op in &summary.operations {
        println!("    {op}");
    }
    println!("  Dropped:         {}", summary.dropped);
    println!("  Persisted:       {}", summary.persisted);
    println!("  Marker advanced: {}", summary.marker_advanced);
    println!("  Duration:        {} ms", summary.duration_ms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use marksync_store::ManifestStore;

    const SNAPSHOT: &str = r#"{
        "update": {"last_update_ms": 99},
        "records": [
            {"key": "a", "url": "https://a.example", "content_hash": "h1", "title": "A"},
            {"key": "b", "url": "https://b.example", "content_hash": "h2", "tags": ["x"]}
        ]
    }"#;

    #[test]
    fn sync_persists_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("remote.json");
        std::fs::write(&snapshot, SNAPSHOT).unwrap();
        let store_dir = dir.path().join("store");

        let options = PassOptions {
            batch_size: 1,
            ..PassOptions::default()
        };
        run(&store_dir, "alice", &snapshot, &options, "json").unwrap();

        let store = FileStore::open(&store_dir).unwrap();
        let state = store.load("alice").unwrap().unwrap();
        assert_eq!(state.last_sync_ms, Some(99));
        assert_eq!(state.manifest.len(), 2);
    }

    #[test]
    fn invalid_batch_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("remote.json");
        std::fs::write(&snapshot, SNAPSHOT).unwrap();

        let options = PassOptions {
            batch_size: 50,
            ..PassOptions::default()
        };
        assert!(run(&dir.path().join("store"), "alice", &snapshot, &options, "text").is_err());
    }
}
