//! Time abstraction for testability
//!
//! Queue timestamps are wall-clock UTC values that get persisted, so the
//! clock hands out `chrono::DateTime<Utc>` rather than monotonic instants.
//! Production code holds a [`SharedClock`]; tests swap in [`MockClock`] and
//! advance it without waiting.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use linkstash_common::testing::{Clock, MockClock, SystemClock};
//!
//! // Use system clock in production
//! let clock = SystemClock;
//! let _now = clock.now();
//!
//! // Use mock clock in tests
//! let mock = MockClock::new();
//! let start = mock.now();
//! mock.advance(Duration::from_secs(5));
//! assert_eq!((mock.now() - start).num_seconds(), 5);
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

/// Trait for time operations to enable testing
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current wall-clock time in UTC.
    fn now(&self) -> DateTime<Utc>;

    /// Milliseconds since the UNIX epoch.
    fn millis_since_epoch(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Clock handle shared between the store, the orchestrator and services.
pub type SharedClock = Arc<dyn Clock>;

/// Real system clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Convenience constructor for a [`SharedClock`] backed by system time.
    #[must_use]
    pub fn shared() -> SharedClock {
        Arc::new(Self)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Mock clock for deterministic testing
///
/// Clones share the same elapsed time, so a test can keep one handle and
/// give another to the code under test.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use linkstash_common::testing::{Clock, MockClock};
///
/// let clock = MockClock::new();
/// let start = clock.now();
///
/// // Simulate 5 seconds passing
/// clock.advance(Duration::from_secs(5));
///
/// assert_eq!(clock.now() - start, chrono::Duration::seconds(5));
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    base: DateTime<Utc>,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a mock clock starting at a fixed instant (2024-01-01T00:00:00Z).
    #[must_use]
    pub fn new() -> Self {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_else(Utc::now);
        Self::at(base)
    }

    /// Create a mock clock starting at `base`.
    #[must_use]
    pub fn at(base: DateTime<Utc>) -> Self {
        Self { base, elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        let mut elapsed = self.elapsed.lock();
        *elapsed += duration;
    }

    /// Set the mock clock to a specific elapsed time since its base
    pub fn set_elapsed(&self, duration: Duration) {
        *self.elapsed.lock() = duration;
    }

    /// How much time has been simulated since the clock was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }

    /// A [`SharedClock`] handle that follows this mock.
    #[must_use]
    pub fn shared(&self) -> SharedClock {
        Arc::new(self.clone())
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.elapsed())
            .ok()
            .and_then(|elapsed| self.base.checked_add_signed(elapsed))
            .unwrap_or(self.base)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for testing::time.
    use super::*;

    /// Validates the system clock scenario.
    ///
    /// Assertions:
    /// - Ensures `now2 >= now1` evaluates to true.
    #[test]
    fn test_system_clock() {
        let clock = SystemClock;
        let now1 = clock.now();
        let now2 = clock.now();

        assert!(now2 >= now1);
        assert!(clock.millis_since_epoch() > 0);
    }

    /// Validates `MockClock::new` behavior for the mock clock advance scenario.
    ///
    /// Assertions:
    /// - Confirms `after - start` equals five seconds.
    #[test]
    fn test_mock_clock_advance() {
        let clock = MockClock::new();
        let start = clock.now();

        clock.advance(Duration::from_secs(5));
        let after = clock.now();

        assert_eq!(after - start, chrono::Duration::seconds(5));
    }

    /// Validates `MockClock::at` starts exactly at the given instant.
    ///
    /// Assertions:
    /// - Confirms `clock.now()` equals the base.
    #[test]
    fn test_mock_clock_at() {
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let clock = MockClock::at(base);
        assert_eq!(clock.now(), base);
    }

    /// Validates `MockClock::set_elapsed` replaces previous elapsed time.
    ///
    /// Assertions:
    /// - Confirms `clock.elapsed()` equals 10s then 20s.
    #[test]
    fn test_mock_clock_set_elapsed() {
        let clock = MockClock::new();

        clock.set_elapsed(Duration::from_secs(10));
        assert_eq!(clock.elapsed(), Duration::from_secs(10));

        clock.set_elapsed(Duration::from_secs(20));
        assert_eq!(clock.elapsed(), Duration::from_secs(20));
    }

    /// Validates that clones and shared handles follow the same time.
    ///
    /// Assertions:
    /// - Confirms `clock2.elapsed()` equals 15s after two advances.
    /// - Confirms the shared handle reports the advanced instant.
    #[test]
    fn test_mock_clock_clone() {
        let clock1 = MockClock::new();
        clock1.advance(Duration::from_secs(10));

        let clock2 = clock1.clone();
        let shared = clock1.shared();
        assert_eq!(clock2.elapsed(), Duration::from_secs(10));

        clock1.advance(Duration::from_secs(5));
        assert_eq!(clock2.elapsed(), Duration::from_secs(15));
        assert_eq!(shared.now(), clock1.now());
    }
}
