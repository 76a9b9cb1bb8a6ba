//! Guest request status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle status of a guest request.
///
/// Only [`GuestStatus::Approved`] guests may receive a QR code or be
/// checked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuestStatus {
    /// Waiting for host review.
    Pending,
    /// Waiting for checkout to complete on a paid event.
    PendingPayment,
    /// Approved by the host.
    Approved,
    /// Rejected by the host.
    Rejected,
    /// On the waitlist.
    Waitlist,
    /// Access revoked by the host.
    Revoked,
    /// Guest left the event.
    Left,
    /// Guest reported they cannot attend.
    CantMake,
}

impl GuestStatus {
    /// Wire representation, as stored in the `status` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::PendingPayment => "PENDING_PAYMENT",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Waitlist => "WAITLIST",
            Self::Revoked => "REVOKED",
            Self::Left => "LEFT",
            Self::CantMake => "CANT_MAKE",
        }
    }
}

impl fmt::Display for GuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown guest status string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown guest status: {0}")]
pub struct ParseGuestStatusError(pub String);

impl FromStr for GuestStatus {
    type Err = ParseGuestStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PENDING_PAYMENT" => Ok(Self::PendingPayment),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "WAITLIST" => Ok(Self::Waitlist),
            "REVOKED" => Ok(Self::Revoked),
            "LEFT" => Ok(Self::Left),
            "CANT_MAKE" => Ok(Self::CantMake),
            other => Err(ParseGuestStatusError(other.to_string())),
        }
    }
}

/// What an approved guest has told the host about their plans.
///
/// [`GuestEventStatus::CantMake`] also moves the guest request to
/// [`GuestStatus::CantMake`]; the other two keep it
/// [`GuestStatus::Approved`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuestEventStatus {
    /// On the way.
    Arriving,
    /// Coming, but late.
    RunningLate,
    /// Not coming after all.
    CantMake,
}

impl GuestEventStatus {
    /// Wire representation, as stored in the `guest_event_status` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Arriving => "ARRIVING",
            Self::RunningLate => "RUNNING_LATE",
            Self::CantMake => "CANT_MAKE",
        }
    }

    /// The guest request status this report implies.
    #[must_use]
    pub const fn guest_status(self) -> GuestStatus {
        match self {
            Self::CantMake => GuestStatus::CantMake,
            Self::Arriving | Self::RunningLate => GuestStatus::Approved,
        }
    }
}

impl fmt::Display for GuestEventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GuestEventStatus {
    type Err = ParseGuestStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ARRIVING" => Ok(Self::Arriving),
            "RUNNING_LATE" => Ok(Self::RunningLate),
            "CANT_MAKE" => Ok(Self::CantMake),
            other => Err(ParseGuestStatusError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_column_text() {
        for status in [
            GuestStatus::Pending,
            GuestStatus::PendingPayment,
            GuestStatus::Approved,
            GuestStatus::Rejected,
            GuestStatus::Waitlist,
            GuestStatus::Revoked,
            GuestStatus::Left,
            GuestStatus::CantMake,
        ] {
            assert_eq!(status.as_str().parse::<GuestStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        assert_eq!(
            "ARRIVING".parse::<GuestStatus>(),
            Err(ParseGuestStatusError("ARRIVING".to_string()))
        );
    }

    #[test]
    fn test_event_status_implies_guest_status() {
        assert_eq!(GuestEventStatus::RunningLate.guest_status(), GuestStatus::Approved);
        assert_eq!(GuestEventStatus::CantMake.guest_status(), GuestStatus::CantMake);
        assert_eq!("RUNNING_LATE".parse::<GuestEventStatus>(), Ok(GuestEventStatus::RunningLate));
        assert!("APPROVED".parse::<GuestEventStatus>().is_err());
    }

    #[test]
    fn test_status_serde_matches_column_text() {
        let json = serde_json::to_string(&GuestStatus::CantMake).unwrap();
        assert_eq!(json, "\"CANT_MAKE\"");
    }
}
