//! Bounded retries with exponential backoff.
//!
//! Whether an error is worth retrying, and how long to wait first, is decided
//! by its [`Diagnose`] classification. The policy only bounds the number of
//! attempts and the longest single wait.

use std::time::Duration;
use tally_common::{CommonError, Diagnose, Result};
use tracing::{debug, warn};

/// Retry settings for blocking operations such as file writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Upper bound on the wait between two attempts.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// A policy that runs the operation exactly once.
    pub fn no_retry() -> Self {
        Self::new(1)
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay before the attempt following failed attempt number `attempt`
    /// (1-based): the error's base delay doubled per previous failure,
    /// capped at `max_delay`.
    pub fn delay_for(&self, error: &CommonError, attempt: u32) -> Option<Duration> {
        let base = error.retry_delay_ms()?;
        let shift = attempt.saturating_sub(1).min(16);
        let delay = Duration::from_millis(base.saturating_mul(1u64 << shift));
        Some(delay.min(self.max_delay))
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. `op` receives the 1-based attempt number.
    ///
    /// Returns the value together with the number of attempts used.
    pub fn run<T, F>(&self, op_name: &str, mut op: F) -> Result<(T, u32)>
    where
        F: FnMut(u32) -> Result<T>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = op_name, attempt, "succeeded after retry");
                    }
                    return Ok((value, attempt));
                }
                Err(error) => {
                    let delay = match self.delay_for(&error, attempt) {
                        Some(delay) if attempt < max_attempts => delay,
                        _ => return Err(error),
                    };
                    warn!(
                        operation = op_name,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying after failure"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}
