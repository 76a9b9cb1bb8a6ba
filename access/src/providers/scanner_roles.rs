//! Staff scanner role repository trait.

use super::ScannerRole;
use crate::error::Result;
use chrono::{DateTime, Utc};
use guestgate_core::EventId;

/// Writes to the staff scanner roles of an event.
///
/// Roles are keyed by `(event, email)`. Emails arrive already normalized.
pub trait ScannerRoleRepository: Send + Sync {
    /// Make `email` an active scanner for the event.
    ///
    /// Creates the role, or reactivates an existing one and clears its
    /// revocation time.
    ///
    /// # Errors
    ///
    /// Returns error if the store write fails.
    fn activate_scanner_role(
        &self,
        event_id: &EventId,
        email: &str,
    ) -> impl std::future::Future<Output = Result<ScannerRole>> + Send;

    /// Mark the role revoked. Returns `false` if `email` has no role at the
    /// event.
    ///
    /// # Errors
    ///
    /// Returns error if the store write fails.
    fn revoke_scanner_role(
        &self,
        event_id: &EventId,
        email: &str,
        revoked_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;
}
