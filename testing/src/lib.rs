//! # GuestGate Testing
//!
//! Testing utilities for the GuestGate crates.
//!
//! This crate provides:
//! - [`FixedClock`]: time that never moves
//! - [`ManualClock`]: time that moves only when a test advances it
//! - [`init_test_tracing`]: opt-in log output for a failing test
//!
//! ## Example
//!
//! ```
//! use guestgate_testing::ManualClock;
//! use guestgate_core::environment::Clock;
//! use chrono::Duration;
//!
//! let clock = ManualClock::at_test_epoch();
//! let start = clock.now();
//! clock.advance(Duration::minutes(11));
//! assert_eq!(clock.now() - start, Duration::minutes(11));
//! ```

use chrono::{DateTime, Utc};
use guestgate_core::environment::Clock;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::Duration;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use guestgate_testing::mocks::FixedClock;
    /// use guestgate_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Manually advanced clock.
    ///
    /// Clones share the same underlying instant, so a clock handed to a
    /// rate limiter or envelope codec can be advanced from the test body.
    /// Resolution is one millisecond.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        millis: Arc<AtomicI64>,
    }

    impl ManualClock {
        /// Create a clock starting at `start`.
        #[must_use]
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
            }
        }

        /// Create a clock starting at the shared test epoch (2025-01-01 00:00:00 UTC).
        #[must_use]
        pub fn at_test_epoch() -> Self {
            Self::new(test_epoch())
        }

        /// Move the clock forward (or backward, for a negative duration).
        pub fn advance(&self, by: Duration) {
            self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
        }

        /// Jump to an absolute instant.
        pub fn set(&self, to: DateTime<Utc>) {
            self.millis.store(to.timestamp_millis(), Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst))
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        }
    }

    /// The instant every test clock starts from: 2025-01-01 00:00:00 UTC.
    #[must_use]
    pub fn test_epoch() -> DateTime<Utc> {
        DateTime::from_timestamp(1_735_689_600, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_epoch())
    }
}

/// Install a `tracing` subscriber that writes to the test harness.
///
/// Safe to call from many tests; only the first call installs anything.
/// Filtering follows `RUST_LOG`.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock, test_epoch};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_epoch_is_new_year_2025() {
        assert_eq!(test_epoch().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::at_test_epoch();
        let handle = clock.clone();

        handle.advance(Duration::seconds(90));

        assert_eq!(clock.now(), test_epoch() + Duration::seconds(90));
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::at_test_epoch();
        let target = test_epoch() + Duration::days(14);
        clock.set(target);
        assert_eq!(clock.now(), target);
    }
}
