//! Error types for access-control and check-in operations.

use thiserror::Error;

/// Result type alias for access operations.
pub type Result<T> = std::result::Result<T, AccessError>;

/// Storage-level failures reported by provider implementations.
///
/// Only [`StoreError::UniqueViolation`] carries meaning for callers: the
/// check-in ledger reads it as "someone else already recorded this entry".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("Unique constraint violated{}", constraint.as_deref().map(|c| format!(": {c}")).unwrap_or_default())]
    UniqueViolation {
        /// Constraint name, when the backend reports one.
        constraint: Option<String>,
    },

    /// Any other backend failure.
    #[error("Database error: {0}")]
    Database(String),
}

/// Error taxonomy for the access-control subsystem.
///
/// Envelope tampering never shows up here: a forged cookie is treated as an
/// absent one and surfaces, at most, as [`AccessError::Unauthorized`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    // ═══════════════════════════════════════════════════════════
    // Authorization Errors
    // ═══════════════════════════════════════════════════════════

    /// Caller holds no owner or scanner credential for the event.
    #[error("Not authorized for this event")]
    Unauthorized,

    /// Event owner does not have the staff-scanner entitlement.
    #[error("Scanner access requires an upgraded host plan")]
    EntitlementRequired,

    // ═══════════════════════════════════════════════════════════
    // Lookup Errors
    // ═══════════════════════════════════════════════════════════

    /// Requested event not found.
    #[error("Event not found")]
    EventNotFound,

    /// Requested guest request not found.
    #[error("Guest request not found")]
    GuestNotFound,

    // ═══════════════════════════════════════════════════════════
    // Guest State Errors
    // ═══════════════════════════════════════════════════════════

    /// Guest has not been approved.
    #[error("Guest is not approved")]
    NotApproved,

    /// Event requires payment and none has been confirmed.
    #[error("Payment has not been confirmed")]
    NotPaid,

    /// Input failed validation.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// What was wrong with the input
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// No signing secret is configured, so credentials cannot be issued.
    #[error("Credential signing is not configured")]
    SigningUnavailable,

    /// Storage operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Internal error (should not be exposed to users).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AccessError {
    /// Shorthand for [`AccessError::InvalidInput`].
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error is due to invalid user input or state
    /// the user can act on.
    ///
    /// # Examples
    ///
    /// ```
    /// # use guestgate_access::AccessError;
    /// assert!(AccessError::NotApproved.is_user_error());
    /// assert!(!AccessError::SigningUnavailable.is_user_error());
    /// ```
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized
                | Self::EntitlementRequired
                | Self::EventNotFound
                | Self::GuestNotFound
                | Self::NotApproved
                | Self::NotPaid
                | Self::InvalidInput { .. }
        )
    }

    /// Returns `true` if a storage uniqueness constraint rejected the write.
    ///
    /// # Examples
    ///
    /// ```
    /// # use guestgate_access::{AccessError, StoreError};
    /// let err = AccessError::from(StoreError::UniqueViolation { constraint: None });
    /// assert!(err.is_unique_violation());
    /// assert!(!AccessError::Internal("boom".into()).is_unique_violation());
    /// ```
    pub const fn is_unique_violation(&self) -> bool {
        matches!(self, Self::Store(StoreError::UniqueViolation { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_display() {
        let named = StoreError::UniqueViolation {
            constraint: Some("checkins_event_access_unique".to_string()),
        };
        assert_eq!(
            named.to_string(),
            "Unique constraint violated: checkins_event_access_unique"
        );

        let anonymous = StoreError::UniqueViolation { constraint: None };
        assert_eq!(anonymous.to_string(), "Unique constraint violated");
    }

    #[test]
    fn test_store_error_is_transparent() {
        let err = AccessError::from(StoreError::Database("connection reset".into()));
        assert_eq!(err.to_string(), "Database error: connection reset");
        assert!(!err.is_user_error());
    }
}
