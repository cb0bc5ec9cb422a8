//! Configuration for the sync engine.

use crate::error::{SyncError, SyncResult};
use marksync_protocol::DEFAULT_MAX_AGE;
use std::time::Duration;

/// Largest number of keys requested in one record fetch.
///
/// Keys travel in the request URL, so the cap bounds its length.
pub const MAX_BATCH_SIZE: usize = 20;

/// Default pause between two remote calls.
pub const DEFAULT_MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(3);

/// Configuration for sync passes.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Account identity (unique per remote collection).
    pub account: String,
    /// Number of keys resolved per remote call.
    pub batch_size: usize,
    /// Minimum interval between two remote calls.
    pub min_request_interval: Duration,
    /// Age after which an unchanged entry is re-fetched.
    pub max_entry_age: Duration,
    /// Retry configuration for metadata and manifest fetches.
    pub retry: RetryConfig,
}

impl SyncConfig {
    /// Creates a new sync configuration.
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            batch_size: MAX_BATCH_SIZE,
            min_request_interval: DEFAULT_MIN_REQUEST_INTERVAL,
            max_entry_age: DEFAULT_MAX_AGE,
            retry: RetryConfig::default(),
        }
    }

    /// Sets the batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Sets the minimum interval between remote calls.
    pub fn with_min_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = interval;
        self
    }

    /// Sets the entry expiry age.
    pub fn with_max_entry_age(mut self, age: Duration) -> Self {
        self.max_entry_age = age;
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Checks that the configuration can drive a pass.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] for an empty account, a batch
    /// size outside `1..=MAX_BATCH_SIZE`, zero retry attempts, or a backoff
    /// multiplier that is not finite or below 1.
    pub fn validate(&self) -> SyncResult<()> {
        if self.account.is_empty() {
            return Err(SyncError::InvalidConfig("account must not be empty".into()));
        }
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(SyncError::InvalidConfig(format!(
                "batch size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.batch_size
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(SyncError::InvalidConfig(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        let multiplier = self.retry.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(SyncError::InvalidConfig(format!(
                "retry.backoff_multiplier must be finite and at least 1.0, got {multiplier}"
            )));
        }
        Ok(())
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, add_jitter: bool) -> Self {
        self.add_jitter = add_jitter;
        self
    }

    /// Calculates the delay before a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let base_delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        // f64::min ignores NaN, so a NaN base lands on max_delay
        let delay_secs = base_delay.min(self.max_delay.as_secs_f64()).max(0.0);

        let total = if self.add_jitter {
            // Up to 25% on top
            delay_secs + delay_secs * 0.25 * rand::random::<f64>()
        } else {
            delay_secs
        };
        Duration::try_from_secs_f64(total).unwrap_or(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}
