//! Check-in store trait.

use super::{CheckinRecord, NewCheckin};
use crate::error::Result;
use guestgate_core::EventId;

/// Append-only check-in records.
pub trait CheckinStore: Send + Sync {
    /// Insert a check-in record.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - A record already exists for `(event_id, access_id)` →
    ///   `StoreError::UniqueViolation`. This must hold under concurrent
    ///   inserts from different connections.
    /// - The store write fails → `StoreError::Database`
    fn insert_checkin(
        &self,
        checkin: NewCheckin,
    ) -> impl std::future::Future<Output = Result<CheckinRecord>> + Send;

    /// Number of check-ins recorded for the event.
    ///
    /// # Errors
    ///
    /// Returns error if the store query fails.
    fn count_for_event(
        &self,
        event_id: &EventId,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;
}
