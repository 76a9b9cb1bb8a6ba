//! Guest access grant repository trait.

use super::GuestAccessRecord;
use crate::error::Result;
use crate::token::TokenHash;
use chrono::{DateTime, Utc};
use guestgate_core::{EventId, GuestRequestId};

/// Access grants and their token hashes.
///
/// Only hashes are ever stored. Lookup at check-in time goes through the
/// single `token_hash` column.
pub trait GuestAccessRepository: Send + Sync {
    /// Insert or replace the grant for a guest request.
    ///
    /// Keyed by guest request: an existing grant keeps its ID, takes the new
    /// hash and issue time, and has its revocation cleared. The previous
    /// hash stops resolving immediately.
    ///
    /// # Errors
    ///
    /// Returns error if the store write fails.
    fn upsert_token_hash(
        &self,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
        token_hash: &TokenHash,
        issued_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<GuestAccessRecord>> + Send;

    /// Find the grant whose current hash is `token_hash`.
    ///
    /// # Errors
    ///
    /// Returns error if the store query fails.
    fn find_by_token_hash(
        &self,
        token_hash: &TokenHash,
    ) -> impl std::future::Future<Output = Result<Option<GuestAccessRecord>>> + Send;

    /// Mark the guest's grant revoked. Returns `false` if there is none.
    ///
    /// # Errors
    ///
    /// Returns error if the store write fails.
    fn revoke_for_guest(
        &self,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
        revoked_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Clear the revocation on the guest's grant, keeping its current hash.
    /// Returns `false` if there is no grant.
    ///
    /// # Errors
    ///
    /// Returns error if the store write fails.
    fn restore_for_guest(
        &self,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;
}
