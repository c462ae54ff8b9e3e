//! # Retry backoff for failed ad loads.
//!
//! [`RetryPolicy`] decides whether a failed load is retried and after how
//! long. The delay for retry `n` (0-indexed) is `first × factor^n`, clamped
//! to `max`. With the defaults that gives `1s, 2s, 4s, 8s, 16s, 30s, 30s…`.
//! The base delay depends only on the retry index, never on the previous
//! delay.
//!
//! ```rust
//! use std::time::Duration;
//! use integration_hub::ads::RetryPolicy;
//!
//! let policy = RetryPolicy::default().with_max_attempts(3);
//! assert_eq!(policy.next_retry(0), Some(Duration::from_secs(1)));
//! assert_eq!(policy.next_retry(2), Some(Duration::from_secs(4)));
//! assert_eq!(policy.next_retry(3), None);
//! ```

use std::time::Duration;

/// Capped exponential retry policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Consecutive failures tolerated before the slot gives up.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub first: Duration,
    /// Multiplicative growth factor.
    pub factor: f64,
    /// Upper bound on any single delay.
    pub max: Duration,
}

impl Default for RetryPolicy {
    /// Returns a policy with:
    /// - `max_attempts = 2`;
    /// - `first = 1s`;
    /// - `factor = 2.0`;
    /// - `max = 30s`.
    fn default() -> Self {
        Self {
            max_attempts: 2,
            first: Duration::from_secs(1),
            factor: 2.0,
            max: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Returns a copy with a different retry budget.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Delay before retry number `attempt` (0-indexed), clamped to
    /// [`RetryPolicy::max`].
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        if !secs.is_finite() || secs < 0.0 || secs > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Delay before the next retry, given how many retries have already
    /// been scheduled since the last success. `None` once the budget is
    /// spent.
    #[must_use]
    pub fn next_retry(&self, retries_so_far: u32) -> Option<Duration> {
        (retries_so_far < self.max_attempts).then(|| self.delay(retries_so_far))
    }
}
