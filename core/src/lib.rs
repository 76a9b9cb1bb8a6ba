//! # GuestGate Core
//!
//! Shared vocabulary for the GuestGate crates.
//!
//! This crate holds the identifiers and enumerations that every other crate
//! speaks, plus the injected environment traits (currently only [`environment::Clock`]).
//! It performs no I/O.
//!
//! ## Identifiers
//!
//! All identifiers are opaque strings assigned by the relational store.
//! Newtypes keep an [`EventId`] from being passed where a [`GuestRequestId`]
//! is expected.
//!
//! ```
//! use guestgate_core::{EventId, GuestRequestId};
//!
//! let event = EventId::from("evt1");
//! let guest = GuestRequestId::from("req1");
//! assert_eq!(event.as_str(), "evt1");
//! assert_eq!(guest.to_string(), "req1");
//! ```

pub mod guest;
pub mod ids;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use guest::{GuestEventStatus, GuestStatus, ParseGuestStatusError};
pub use ids::{AccessId, EventId, GuestRequestId, HostUserId};

/// Environment module - injected dependencies.
///
/// Everything time-dependent in the access layer (envelope TTLs, rate-limit
/// windows, membership timestamps) reads time through [`Clock`] so that tests
/// can pin or advance it.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use guestgate_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
        fn now(&self) -> DateTime<Utc> {
            (**self).now()
        }
    }
}
