//! # GuestGate Access
//!
//! Credentials and door control for events: who may scan, which QR codes
//! admit whom, and a ledger that records each guest's entry exactly once.
//!
//! ## Components
//!
//! - [`envelope::SignedEnvelopeCodec`]: HMAC-signed cookie payloads
//! - [`rate_limit::RateLimiter`]: fixed-window in-process throttling
//! - [`token::AccessTokenService`]: random QR tokens, stored only as hashes
//! - [`membership::GuestMembershipStore`]: a browser's guest requests
//! - [`scanner::ScannerSessionManager`]: access code → gate → session
//! - [`resolver::EventAccessResolver`]: owner or scanner for an event
//! - [`scanner_roles::ScannerRoleService`]: staff scanner roles by email
//! - [`checkin::CheckInLedger`]: idempotent entry records
//!
//! Persistence sits behind the traits in [`providers`]. The in-memory
//! [`mocks::MockAccessStore`] (feature `test-utils`) and the `PostgreSQL`
//! store (feature `postgres`) both implement them.
//!
//! ## Example: from join to door
//!
//! ```
//! # let outcome: guestgate_access::Result<()> = tokio_test::block_on(async {
//! use guestgate_access::mocks::MockAccessStore;
//! use guestgate_access::providers::EventRecord;
//! use guestgate_access::resolver::{Caller, AuthenticatedUser};
//! use guestgate_access::{AccessConfig, AccessEnvironment, CheckinResult};
//! use guestgate_access::membership::GuestMembership;
//! use guestgate_core::{EventId, HostUserId};
//!
//! let store = MockAccessStore::new();
//! store.insert_event(EventRecord {
//!     id: EventId::from("evt1"),
//!     name: "Launch".to_string(),
//!     host_user_id: HostUserId::from("host1"),
//!     capacity: Some(100),
//!     requires_payment: false,
//!     scanner_access_code: None,
//! });
//! let env = AccessEnvironment::new(store, AccessConfig::new().with_guest_secret("secret"));
//!
//! let guest = env.guests().join(&EventId::from("evt1"), "Ada").await?;
//! env.guests().approve(&guest.event_id, &guest.id).await?;
//!
//! let membership = GuestMembership {
//!     event_id: guest.event_id.clone(),
//!     guest_request_id: guest.id.clone(),
//!     issued_at: guest.created_at,
//! };
//! let qr = env.guests().issue_qr(&membership).await?;
//!
//! let host = Caller {
//!     host_user: Some(AuthenticatedUser { id: HostUserId::from("host1"), email: None }),
//!     scanner_session: None,
//! };
//! let access = env.resolver().require(&EventId::from("evt1"), &host).await?;
//! let report = env.checkins().check_in(&access, &qr.token.raw_token).await?;
//! assert_eq!(report.result, CheckinResult::CheckedIn);
//! # Ok(())
//! # });
//! # outcome.unwrap();
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod checkin;
pub mod config;
pub mod constants;
pub mod envelope;
pub mod environment;
pub mod error;
pub mod guests;
pub mod membership;
pub mod providers;
pub mod rate_limit;
pub mod resolver;
pub mod scanner;
pub mod scanner_roles;
pub mod token;
pub mod utils;

#[cfg(feature = "test-utils")]
pub mod mocks;

#[cfg(feature = "postgres")]
pub mod stores;

// Re-export main types for convenience
pub use checkin::{CheckInLedger, CheckInService, CheckinCounters, CheckinReport, CheckinResult, EntryOutcome};
pub use config::AccessConfig;
pub use envelope::SignedEnvelopeCodec;
pub use environment::AccessEnvironment;
pub use error::{AccessError, Result, StoreError};
pub use guests::{GuestAccessService, GuestAction};
pub use membership::{GuestMembership, GuestMembershipStore};
pub use rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimiter};
pub use resolver::{Caller, EventAccess, EventAccessResolver};
pub use scanner::{ScannerError, ScannerSessionManager};
pub use scanner_roles::ScannerRoleService;
pub use token::{AccessTokenService, IssuedToken, TokenHash};
