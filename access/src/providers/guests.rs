//! Guest repository trait.

use super::{GuestRecord, NewGuestRequest};
use crate::error::Result;
use chrono::{DateTime, Utc};
use guestgate_core::{EventId, GuestEventStatus, GuestRequestId, GuestStatus};

/// Guest requests for events.
///
/// Every lookup is scoped by event: a guest request ID from one event never
/// resolves under another.
pub trait GuestRepository: Send + Sync {
    /// Look up a guest request.
    ///
    /// # Errors
    ///
    /// Returns error if the store query fails.
    fn find_guest(
        &self,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
    ) -> impl std::future::Future<Output = Result<Option<GuestRecord>>> + Send;

    /// Create a guest request.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The recovery code is already used at this event →
    ///   `StoreError::UniqueViolation`
    /// - The store write fails
    fn create_guest_request(
        &self,
        request: NewGuestRequest,
    ) -> impl std::future::Future<Output = Result<GuestRecord>> + Send;

    /// Most recent guest request at the event with this recovery code.
    ///
    /// # Errors
    ///
    /// Returns error if the store query fails.
    fn find_by_recovery_code(
        &self,
        event_id: &EventId,
        recovery_code: &str,
    ) -> impl std::future::Future<Output = Result<Option<GuestRecord>>> + Send;

    /// Set a guest's status. Returns `false` if no such guest exists.
    ///
    /// # Errors
    ///
    /// Returns error if the store write fails.
    fn set_status(
        &self,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
        status: GuestStatus,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Record payment confirmation. Returns `false` if no such guest exists.
    ///
    /// # Errors
    ///
    /// Returns error if the store write fails.
    fn confirm_payment(
        &self,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
        confirmed_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Store a guest's reported plan and move their status to
    /// [`GuestEventStatus::guest_status`], in one write. Returns `false` if
    /// no such guest exists.
    ///
    /// # Errors
    ///
    /// Returns error if the store write fails.
    fn record_event_status(
        &self,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
        event_status: GuestEventStatus,
        reported_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Number of approved guests at the event.
    ///
    /// # Errors
    ///
    /// Returns error if the store query fails.
    fn count_approved(
        &self,
        event_id: &EventId,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;
}
