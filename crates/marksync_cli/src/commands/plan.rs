//! Plan command implementation.

use super::{load_snapshot, PassOptions};
use marksync_engine::{Clock, ManifestDiffer, SyncConfig, SyncState, SystemClock};
use marksync_protocol::{Action, RemoteManifest, RemoteManifestEntry};
use marksync_store::{FileStore, ManifestStore};
use serde::Serialize;
use std::path::Path;

/// What a pass would do.
#[derive(Debug, Serialize)]
pub struct PlanResult {
    /// Account planned for.
    pub account: String,
    /// Whether the pass would run at all.
    pub should_sync: bool,
    /// Keys that would be added.
    pub adds: Vec<String>,
    /// Keys that would be updated.
    pub updates: Vec<String>,
    /// Keys that would be removed.
    pub removes: Vec<String>,
}

/// Runs the plan command.
pub fn run(
    store_dir: &Path,
    account: &str,
    remote: &Path,
    options: &PassOptions,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = options.config(account);
    config.validate()?;
    let snapshot = load_snapshot(remote)?;
    let store = FileStore::open(store_dir)?;
    let stored = store.load(account)?;
    if stored.is_none() {
        tracing::info!(account, "no stored state, planning from an empty manifest");
    }

    let mut state = match stored {
        Some(stored) => SyncState::from_stored(stored),
        None => SyncState::new(account),
    };
    state.set_remote_meta(snapshot.update.clone());

    let remote_manifest: RemoteManifest = snapshot
        .records
        .iter()
        .map(|r| RemoteManifestEntry::new(r.key.clone(), r.content_hash.clone()))
        .collect();
    let result = build_plan(&state, &remote_manifest, SystemClock.now_ms(), &config);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Diffs `state` against `remote` with the same expiry a pass would use.
fn build_plan(
    state: &SyncState,
    remote: &RemoteManifest,
    now_ms: u64,
    config: &SyncConfig,
) -> PlanResult {
    let plan = ManifestDiffer::new(now_ms, config.max_entry_age).diff(state.working_copy(), remote);

    let mut result = PlanResult {
        account: state.account().to_string(),
        should_sync: state.should_sync(now_ms, config.max_entry_age),
        adds: Vec::new(),
        updates: Vec::new(),
        removes: Vec::new(),
    };
    // Removes are emitted ready, so pending work is only adds and updates
    for partial in plan.pending() {
        let key = partial.key.as_str().to_string();
        if partial.action == Action::Add {
            result.adds.push(key);
        } else {
            result.updates.push(key);
        }
    }
    result
        .removes
        .extend(plan.ready().map(|op| op.key().as_str().to_string()));
    result
}

fn print_text_output(result: &PlanResult) {
    println!("Plan for {}", result.account);
    println!("==========={}", "=".repeat(result.account.len()));
    println!();
    if !result.should_sync {
        println!("Remote unchanged and nothing expired; a pass would be skipped.");
        println!();
    }
    println!("  Adds:    {}", result.adds.len());
    println!("  Updates: {}", result.updates.len());
    println!("  Removes: {}", result.removes.len());

    for (label, keys) in [
        ("add", &result.adds),
        ("update", &result.updates),
        ("remove", &result.removes),
    ] {
        for key in keys {
            println!("    {label:<6} {key}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marksync_protocol::LocalManifestEntry;

    #[test]
    fn plan_does_not_touch_store() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("remote.json");
        std::fs::write(
            &snapshot,
            r#"{"update": {"last_update_ms": 5}, "records": [{"key": "a", "url": "https://a.example", "content_hash": "h"}]}"#,
        )
        .unwrap();
        let store_dir = dir.path().join("store");

        run(&store_dir, "alice", &snapshot, &PassOptions::default(), "text").unwrap();

        let store = FileStore::open(&store_dir).unwrap();
        assert!(store.load("alice").unwrap().is_none());
    }

    #[test]
    fn missing_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = run(
            dir.path(),
            "alice",
            &dir.path().join("nope.json"),
            &PassOptions::default(),
            "text",
        );
        assert!(result.is_err());
    }

    const DAY_MS: u64 = 24 * 60 * 60 * 1000;

    fn state_with(entries: &[(&str, &str, u64)]) -> SyncState {
        let mut state = SyncState::new("alice");
        state.replace_local(
            entries
                .iter()
                .map(|(k, h, at)| LocalManifestEntry::new(format!("https://{k}.example"), *k, *h, *at))
                .collect(),
        );
        state
    }

    #[test]
    fn plan_sorts_keys_by_action() {
        let state = state_with(&[("kept", "h", 0), ("changed", "old", 0), ("gone", "h", 0)]);
        let remote = RemoteManifest::new(vec![
            RemoteManifestEntry::new("kept", "h"),
            RemoteManifestEntry::new("changed", "new"),
            RemoteManifestEntry::new("fresh", "h"),
        ]);
        let config = PassOptions::default().config("alice");

        let result = build_plan(&state, &remote, DAY_MS, &config);

        assert_eq!(result.adds, vec!["fresh".to_string()]);
        assert_eq!(result.updates, vec!["changed".to_string()]);
        assert_eq!(result.removes, vec!["gone".to_string()]);
    }

    #[test]
    fn plan_uses_configured_max_age() {
        let state = state_with(&[("a", "h", 0)]);
        let remote = RemoteManifest::new(vec![RemoteManifestEntry::new("a", "h")]);
        let now_ms = 3 * DAY_MS;

        let default_age = PassOptions::default().config("alice");
        assert!(build_plan(&state, &remote, now_ms, &default_age).updates.is_empty());

        let short_age = PassOptions {
            max_age_days: Some(1),
            ..PassOptions::default()
        }
        .config("alice");
        let result = build_plan(&state, &remote, now_ms, &short_age);
        assert_eq!(result.updates, vec!["a".to_string()]);
    }
}
