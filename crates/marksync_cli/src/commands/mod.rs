//! CLI command implementations.

pub mod inspect;
pub mod plan;
pub mod sync;

use marksync_engine::{RemoteSnapshot, SyncConfig, MAX_BATCH_SIZE};
use std::path::Path;
use std::time::Duration;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Tunables shared by the commands that plan or run a pass.
#[derive(Debug, Clone)]
pub struct PassOptions {
    /// Maximum keys per record fetch.
    pub batch_size: usize,
    /// Minimum milliseconds between remote calls.
    pub interval_ms: u64,
    /// Entry age in days after which an unchanged entry is re-fetched.
    pub max_age_days: Option<u64>,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            interval_ms: 0,
            max_age_days: None,
        }
    }
}

impl PassOptions {
    /// Builds the engine configuration for `account`.
    pub fn config(&self, account: &str) -> SyncConfig {
        let config = SyncConfig::new(account)
            .with_batch_size(self.batch_size)
            .with_min_request_interval(Duration::from_millis(self.interval_ms));
        match self.max_age_days {
            Some(days) => config.with_max_entry_age(DAY.saturating_mul(
                u32::try_from(days).unwrap_or(u32::MAX),
            )),
            None => config,
        }
    }
}

/// Reads a remote snapshot from a JSON file.
pub fn load_snapshot(path: &Path) -> Result<RemoteSnapshot, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read snapshot {}: {e}", path.display()))?;
    let snapshot = serde_json::from_str(&text)
        .map_err(|e| format!("Invalid snapshot {}: {e}", path.display()))?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marksync_protocol::DEFAULT_MAX_AGE;

    #[test]
    fn default_options_keep_engine_defaults() {
        let config = PassOptions::default().config("alice");
        assert_eq!(config.max_entry_age, DEFAULT_MAX_AGE);
        assert_eq!(config.batch_size, MAX_BATCH_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn max_age_is_given_in_days() {
        let options = PassOptions {
            max_age_days: Some(2),
            ..PassOptions::default()
        };
        assert_eq!(options.config("alice").max_entry_age, DAY * 2);
    }
}
