//! Exponential backoff policy for queued deliveries.
//!
//! The delay for the n-th attempt is `base * 2^(n-1)`, clamped to `cap`.
//! There is no jitter: the schedule is a pure function of the attempt count,
//! which keeps persisted `next_attempt_at` values reproducible.

use std::time::Duration;

use super::constants::{
    CONSERVATIVE_BASE_DELAY, CONSERVATIVE_MAX_ATTEMPTS, CONSERVATIVE_MAX_DELAY,
    FAST_RETRY_BASE_DELAY, FAST_RETRY_MAX_DELAY, MAX_BACKOFF_EXPONENT, MIN_MAX_ATTEMPTS,
};
use super::error::{BackoffError, BackoffResult};

/// Attempt-count to retry-delay mapping with an optional attempt ceiling.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use linkstash_common::BackoffPolicy;
///
/// let policy = BackoffPolicy::fast_retry();
/// assert_eq!(policy.delay(1), Duration::from_secs(10));
/// assert_eq!(policy.delay(3), Duration::from_secs(40));
/// assert_eq!(policy.delay(10), Duration::from_secs(900));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    cap: Duration,
    max_attempts: Option<u32>,
}

impl BackoffPolicy {
    /// Build a validated policy.
    ///
    /// # Errors
    ///
    /// Returns [`BackoffError::InvalidConfig`] when `base` is zero, when
    /// `base` exceeds `cap`, or when `max_attempts` is `Some(0)`.
    pub fn new(base: Duration, cap: Duration, max_attempts: Option<u32>) -> BackoffResult<Self> {
        if base.is_zero() {
            return Err(BackoffError::zero_base());
        }
        if base > cap {
            return Err(BackoffError::base_exceeds_cap(base, cap));
        }
        if let Some(max) = max_attempts {
            if max < MIN_MAX_ATTEMPTS {
                return Err(BackoffError::max_attempts_too_small(max, MIN_MAX_ATTEMPTS));
            }
        }
        Ok(Self { base, cap, max_attempts })
    }

    /// 10s base, 15 minute cap, retries forever.
    #[must_use]
    pub const fn fast_retry() -> Self {
        Self { base: FAST_RETRY_BASE_DELAY, cap: FAST_RETRY_MAX_DELAY, max_attempts: None }
    }

    /// 30s base, 6 hour cap, gives up after 8 attempts.
    #[must_use]
    pub const fn conservative() -> Self {
        Self {
            base: CONSERVATIVE_BASE_DELAY,
            cap: CONSERVATIVE_MAX_DELAY,
            max_attempts: Some(CONSERVATIVE_MAX_ATTEMPTS),
        }
    }

    /// Return a copy with a different attempt ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`BackoffError::InvalidConfig`] for `Some(0)`.
    pub fn with_max_attempts(self, max_attempts: Option<u32>) -> BackoffResult<Self> {
        Self::new(self.base, self.cap, max_attempts)
    }

    #[must_use]
    pub const fn base(&self) -> Duration {
        self.base
    }

    #[must_use]
    pub const fn cap(&self) -> Duration {
        self.cap
    }

    #[must_use]
    pub const fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Delay to wait after `attempt_count` attempts have been made.
    ///
    /// `attempt_count` of 0 or 1 both yield `base`. The result never exceeds
    /// `cap` and never decreases as `attempt_count` grows.
    #[must_use]
    pub fn delay(&self, attempt_count: u32) -> Duration {
        let exponent = attempt_count.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        let multiplier = 2u32.saturating_pow(exponent);
        self.base.saturating_mul(multiplier).min(self.cap)
    }

    /// Whether another attempt would exceed the ceiling.
    #[must_use]
    pub fn is_exhausted(&self, attempt_count: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt_count >= max)
    }

    /// Delay before the next attempt, or `None` once the policy is exhausted.
    #[must_use]
    pub fn next_delay(&self, attempt_count: u32) -> Option<Duration> {
        if self.is_exhausted(attempt_count) {
            #[cfg(feature = "observability")]
            tracing::debug!(attempt_count, max_attempts = ?self.max_attempts, "backoff exhausted");
            return None;
        }
        Some(self.delay(attempt_count))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::fast_retry()
    }
}
