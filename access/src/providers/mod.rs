//! Collaborator providers.
//!
//! This module defines traits for every external dependency the access
//! layer reads from or writes to. Event CRUD, guest management, and billing
//! live elsewhere; this crate sees them only through these interfaces.
//!
//! # Architecture
//!
//! Providers are **interfaces**, not implementations. The services in this
//! crate depend on these traits, and the runtime provides concrete
//! implementations:
//!
//! - **Testing**: [`crate::mocks::MockAccessStore`] (in-memory, deterministic)
//! - **Production**: `PostgresAccessStore` (feature `postgres`)
//!
//! ## Uniqueness is the store's job
//!
//! [`CheckinStore::insert_checkin`] must reject a second record for the
//! same `(event, access grant)` pair with
//! [`StoreError::UniqueViolation`](crate::StoreError::UniqueViolation),
//! atomically with respect to concurrent inserts. The check-in ledger
//! never reads before it writes.

use crate::token::TokenHash;
use chrono::{DateTime, Utc};
use guestgate_core::{AccessId, EventId, GuestEventStatus, GuestRequestId, GuestStatus, HostUserId};
use serde::{Deserialize, Serialize};

pub mod access;
pub mod checkin;
pub mod events;
pub mod guests;
pub mod scanner_roles;

pub use access::GuestAccessRepository;
pub use checkin::CheckinStore;
pub use events::EventDirectory;
pub use guests::GuestRepository;
pub use scanner_roles::ScannerRoleRepository;

/// Everything the access services need from storage, in one bound.
///
/// Implemented automatically for any cloneable type that implements all
/// five provider traits.
pub trait AccessStore:
    EventDirectory
    + ScannerRoleRepository
    + GuestRepository
    + GuestAccessRepository
    + CheckinStore
    + Clone
    + 'static
{
}

impl<T> AccessStore for T where
    T: EventDirectory
        + ScannerRoleRepository
        + GuestRepository
        + GuestAccessRepository
        + CheckinStore
        + Clone
        + 'static
{
}

/// Event, as seen by the access layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event ID.
    pub id: EventId,

    /// Display name.
    pub name: String,

    /// The host who created the event.
    pub host_user_id: HostUserId,

    /// Maximum number of attendees, if capped.
    pub capacity: Option<u32>,

    /// Guests must pay before they can be checked in.
    pub requires_payment: bool,

    /// Six-digit code scanning staff enter at the door, if configured.
    pub scanner_access_code: Option<String>,
}

/// Guest request, as seen by the access layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestRecord {
    /// Guest request ID.
    pub id: GuestRequestId,

    /// Event the request belongs to.
    pub event_id: EventId,

    /// Name the guest gave when joining.
    pub display_name: String,

    /// Current status.
    pub status: GuestStatus,

    /// When payment was confirmed, for paid events.
    pub payment_confirmed_at: Option<DateTime<Utc>>,

    /// Short numeric code that lets a guest re-attach a new device.
    pub recovery_code: Option<String>,

    /// Latest plan the guest reported, if any.
    pub event_status: Option<GuestEventStatus>,

    /// When the guest reported it.
    pub event_status_at: Option<DateTime<Utc>>,

    /// Request creation time.
    pub created_at: DateTime<Utc>,
}

impl GuestRecord {
    /// Returns `true` if payment has been confirmed.
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        self.payment_confirmed_at.is_some()
    }
}

/// Fields for a new guest request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGuestRequest {
    /// Event to join.
    pub event_id: EventId,

    /// Trimmed display name.
    pub display_name: String,

    /// Freshly generated recovery code.
    pub recovery_code: String,

    /// Initial status.
    pub status: GuestStatus,

    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Access grant: the row holding a guest's current token hash.
///
/// One grant exists per guest request. Re-issuing a token overwrites the
/// hash in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestAccessRecord {
    /// Grant ID (the identity check-ins are unique on).
    pub id: AccessId,

    /// Event the grant belongs to.
    pub event_id: EventId,

    /// Guest request the grant belongs to.
    pub guest_request_id: GuestRequestId,

    /// SHA-256 of the current raw token.
    pub token_hash: TokenHash,

    /// When the current token was issued.
    pub issued_at: DateTime<Utc>,

    /// When the grant was revoked, if it was.
    pub revoked_at: Option<DateTime<Utc>>,
}

impl GuestAccessRecord {
    /// Returns `true` if the grant has been revoked.
    #[must_use]
    pub const fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

/// Status of a staff scanner role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScannerRoleStatus {
    /// Invited, not yet accepted.
    Invited,
    /// May scan.
    Active,
    /// Access withdrawn.
    Revoked,
}

impl ScannerRoleStatus {
    /// Column text.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invited => "INVITED",
            Self::Active => "ACTIVE",
            Self::Revoked => "REVOKED",
        }
    }

    /// Parse column text. Unknown values read as [`Self::Revoked`].
    #[must_use]
    pub fn from_column(value: &str) -> Self {
        match value {
            "INVITED" => Self::Invited,
            "ACTIVE" => Self::Active,
            _ => Self::Revoked,
        }
    }
}

/// Staff scanner role granted to an email address for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerRole {
    /// Event ID.
    pub event_id: EventId,

    /// Normalized (trimmed, lowercase) email.
    pub scanner_email: String,

    /// Role status.
    pub status: ScannerRoleStatus,

    /// Revocation time, if revoked.
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ScannerRole {
    /// Active and not revoked.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, ScannerRoleStatus::Active) && self.revoked_at.is_none()
    }
}

/// Fields for a new check-in record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCheckin {
    /// Event ID.
    pub event_id: EventId,

    /// Access grant being checked in.
    pub access_id: AccessId,

    /// Who scanned (see [`crate::resolver::EventAccess::actor_label`]).
    pub checked_in_by: String,

    /// Scan time.
    pub checked_in_at: DateTime<Utc>,
}

/// Stored check-in record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckinRecord {
    /// Record ID.
    pub id: String,

    /// Event ID.
    pub event_id: EventId,

    /// Access grant checked in.
    pub access_id: AccessId,

    /// Who scanned.
    pub checked_in_by: String,

    /// Scan time.
    pub checked_in_at: DateTime<Utc>,
}
