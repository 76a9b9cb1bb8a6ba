//! Event directory trait.

use super::{EventRecord, ScannerRole};
use crate::error::Result;
use guestgate_core::{EventId, HostUserId};

/// Read-only view of events, host plans, and staff scanner roles.
///
/// # Implementation Notes
///
/// - `find_active_scanner_role` receives an already-normalized email and
///   must only return roles that are `ACTIVE` with no revocation time.
/// - Entitlement is evaluated live on every call; callers do not cache it.
pub trait EventDirectory: Send + Sync {
    /// Look up an event.
    ///
    /// # Errors
    ///
    /// Returns error if the store query fails.
    fn find_event(
        &self,
        event_id: &EventId,
    ) -> impl std::future::Future<Output = Result<Option<EventRecord>>> + Send;

    /// Whether the host's plan includes staff scanners.
    ///
    /// # Errors
    ///
    /// Returns error if the store query fails.
    fn owner_has_scanner_entitlement(
        &self,
        host_user_id: &HostUserId,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Find an active, non-revoked scanner role for `email` at the event.
    ///
    /// # Errors
    ///
    /// Returns error if the store query fails.
    fn find_active_scanner_role(
        &self,
        event_id: &EventId,
        email: &str,
    ) -> impl std::future::Future<Output = Result<Option<ScannerRole>>> + Send;
}
