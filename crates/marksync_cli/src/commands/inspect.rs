//! Inspect command implementation.

use marksync_engine::{Clock, SystemClock};
use marksync_protocol::DEFAULT_MAX_AGE;
use marksync_store::{AccountState, FileStore, ManifestStore};
use serde::Serialize;
use std::path::Path;

/// Account inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Account name.
    pub account: String,
    /// Remote update marker of the last clean pass.
    pub last_sync_ms: Option<u64>,
    /// Number of manifest entries.
    pub entry_count: usize,
    /// Number of entries older than the default max age.
    pub expired_count: usize,
    /// Manifest entries (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<EntryInfo>>,
}

/// One manifest entry.
#[derive(Debug, Serialize)]
pub struct EntryInfo {
    /// Bookmark key.
    pub key: String,
    /// Bookmarked URL.
    pub url: String,
    /// Content hash at indexing time.
    pub content_hash: String,
    /// When the entry was last indexed.
    pub last_indexed_at_ms: u64,
    /// Whether the entry is due for a refresh.
    pub expired: bool,
}

/// Runs the inspect command.
pub fn run(
    store_dir: &Path,
    account: Option<&str>,
    show_entries: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if !store_dir.exists() {
        return Err(format!("No store found at {}", store_dir.display()).into());
    }
    let store = FileStore::open(store_dir)?;

    let Some(account) = account else {
        let accounts = store.accounts()?;
        match format {
            "json" => println!("{}", serde_json::to_string_pretty(&accounts)?),
            _ => {
                println!("Accounts in {}", store_dir.display());
                for account in &accounts {
                    println!("  {account}");
                }
                if accounts.is_empty() {
                    println!("  (none)");
                }
            }
        }
        return Ok(());
    };

    let state = store
        .load(account)?
        .ok_or_else(|| format!("No state stored for account {account}"))?;
    let result = inspect_state(&state, SystemClock.now_ms(), show_entries);

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

fn inspect_state(state: &AccountState, now_ms: u64, show_entries: bool) -> InspectResult {
    let entries: Vec<EntryInfo> = state
        .manifest
        .iter()
        .map(|e| EntryInfo {
            key: e.key.as_str().to_string(),
            url: e.url.clone(),
            content_hash: e.content_hash.clone(),
            last_indexed_at_ms: e.last_indexed_at_ms,
            expired: e.is_expired(now_ms, DEFAULT_MAX_AGE),
        })
        .collect();

    InspectResult {
        account: state.account.clone(),
        last_sync_ms: state.last_sync_ms,
        entry_count: entries.len(),
        expired_count: entries.iter().filter(|e| e.expired).count(),
        entries: show_entries.then_some(entries),
    }
}

fn print_text_output(result: &InspectResult) {
    println!("Account: {}", result.account);
    println!("==========");
    println!();
    match result.last_sync_ms {
        Some(ms) => println!("  Last sync marker: {ms}"),
        None => println!("  Last sync marker: never"),
    }
    println!("  Entries:          {}", result.entry_count);
    println!("  Expired:          {}", result.expired_count);

    if let Some(entries) = &result.entries {
        println!();
        println!("Entries:");
        for entry in entries {
            let flag = if entry.expired { " (expired)" } else { "" };
            println!("  {} {} [{}]{flag}", entry.key, entry.url, entry.content_hash);
        }
    }
}
