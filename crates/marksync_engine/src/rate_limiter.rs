//! Pacing of outbound remote calls.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Grants turns no closer together than a fixed minimum interval.
///
/// One limiter is shared by every call a session makes to the remote
/// source. The lock is held while sleeping, so concurrent callers are
/// served one at a time and each still observes the full interval.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_turn: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter with the given minimum interval.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_turn: Mutex::new(None),
        }
    }

    /// Returns the minimum interval between turns.
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Blocks until the caller may issue its call.
    ///
    /// The first turn is granted immediately. Returns how long the caller
    /// was made to wait.
    pub fn wait_for_turn(&self) -> Duration {
        let mut last_turn = self.last_turn.lock();

        let waited = match *last_turn {
            Some(previous) => {
                let elapsed = previous.elapsed();
                if elapsed < self.min_interval {
                    let wait = self.min_interval - elapsed;
                    std::thread::sleep(wait);
                    wait
                } else {
                    Duration::ZERO
                }
            }
            None => Duration::ZERO,
        };

        *last_turn = Some(Instant::now());
        if !waited.is_zero() {
            tracing::trace!(waited_ms = waited.as_millis() as u64, "rate limited");
        }
        waited
    }
}
