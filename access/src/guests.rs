//! Guest lifecycle: joining, recovering a device, host decisions, QR
//! issuance, and the guest's own attendance reports.
//!
//! These are the operations that feed the rest of the crate. Approval
//! issues the first access token; a guest fetching their QR code rotates
//! it; revocation marks both the guest and the grant. A guest who reports
//! they cannot make it has their grant revoked until they say otherwise.

use crate::constants::bounds;
use crate::error::{AccessError, Result};
use crate::membership::GuestMembership;
use crate::providers::{
    AccessStore, EventDirectory, EventRecord, GuestAccessRecord, GuestAccessRepository, GuestRecord,
    GuestRepository, NewGuestRequest,
};
use crate::resolver::EventAccess;
use crate::token::{AccessTokenService, IssuedToken};
use crate::utils::{generate_recovery_code, is_recovery_code, normalize_guest_name};
use guestgate_core::environment::Clock;
use guestgate_core::{EventId, GuestEventStatus, GuestRequestId, GuestStatus};
use std::str::FromStr;
use std::sync::Arc;

/// Host decision on a guest request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestAction {
    /// Approve and issue an access token.
    Approve,
    /// Reject the request.
    Reject,
    /// Revoke the guest and their access grant.
    Revoke,
    /// Confirm payment.
    MarkPaid,
    /// Record that the guest cannot attend.
    MarkCantMake,
}

impl FromStr for GuestAction {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "APPROVE" => Ok(Self::Approve),
            "REJECT" => Ok(Self::Reject),
            "REVOKE" => Ok(Self::Revoke),
            "MARK_PAID" => Ok(Self::MarkPaid),
            "MARK_CANT_MAKE" => Ok(Self::MarkCantMake),
            other => Err(AccessError::invalid_input(format!("unknown action {other:?}"))),
        }
    }
}

/// A QR token handed to a guest.
#[derive(Debug, Clone)]
pub struct QrGrant {
    /// Token to encode in the QR code.
    pub token: IssuedToken,
    /// The guest it was issued to.
    pub guest: GuestRecord,
    /// The event it admits to.
    pub event: EventRecord,
}

/// Guest-facing and host-facing lifecycle operations.
#[derive(Clone)]
pub struct GuestAccessService<S> {
    store: S,
    clock: Arc<dyn Clock>,
    tokens: AccessTokenService,
}

impl<S: AccessStore> GuestAccessService<S> {
    /// Create a service over `store`.
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            tokens: AccessTokenService::new(),
        }
    }

    /// Create a guest request for `event_id`.
    ///
    /// The request starts `PENDING` with a fresh five-digit recovery code.
    /// Codes are unique per event; a collision is retried with a new code.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The event does not exist → [`AccessError::EventNotFound`]
    /// - The trimmed name is not 2-80 characters → [`AccessError::InvalidInput`]
    /// - Every recovery code attempt collided → [`AccessError::Internal`]
    /// - A store operation fails
    pub async fn join(&self, event_id: &EventId, display_name: &str) -> Result<GuestRecord> {
        let display_name = normalize_guest_name(display_name)
            .ok_or_else(|| AccessError::invalid_input("display name must be 2 to 80 characters"))?;
        self.event(event_id).await?;

        for attempt in 1..=bounds::RECOVERY_CODE_ATTEMPTS {
            let request = NewGuestRequest {
                event_id: event_id.clone(),
                display_name: display_name.clone(),
                recovery_code: generate_recovery_code(),
                status: GuestStatus::Pending,
                created_at: self.clock.now(),
            };
            match self.store.create_guest_request(request).await {
                Ok(guest) => {
                    tracing::info!(event_id = %event_id, guest_request_id = %guest.id, "Guest joined");
                    return Ok(guest);
                }
                Err(error) if error.is_unique_violation() => {
                    tracing::debug!(event_id = %event_id, attempt, "Recovery code collision");
                }
                Err(error) => return Err(error),
            }
        }

        tracing::error!(event_id = %event_id, "Could not allocate a recovery code");
        Err(AccessError::Internal("recovery code space exhausted".to_string()))
    }

    /// Find the guest request a recovery code belongs to.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The code is not 4-5 digits → [`AccessError::InvalidInput`]
    /// - The event does not exist → [`AccessError::EventNotFound`]
    /// - No request has this code → [`AccessError::GuestNotFound`]
    /// - A store operation fails
    pub async fn recover(&self, event_id: &EventId, recovery_code: &str) -> Result<GuestRecord> {
        let recovery_code = recovery_code.trim();
        if !is_recovery_code(recovery_code) {
            return Err(AccessError::invalid_input("recovery code must be 4 or 5 digits"));
        }
        self.event(event_id).await?;

        let guest = self
            .store
            .find_by_recovery_code(event_id, recovery_code)
            .await?
            .ok_or(AccessError::GuestNotFound)?;
        tracing::info!(event_id = %event_id, guest_request_id = %guest.id, "Guest recovered access");
        Ok(guest)
    }

    /// Issue a fresh QR token for the guest in `membership`, replacing the
    /// previous one.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The membership's guest request no longer exists → [`AccessError::Unauthorized`]
    /// - The guest is not approved → [`AccessError::NotApproved`]
    /// - Payment is required and not confirmed → [`AccessError::NotPaid`]
    /// - A store operation fails
    pub async fn issue_qr(&self, membership: &GuestMembership) -> Result<QrGrant> {
        let guest = self
            .store
            .find_guest(&membership.event_id, &membership.guest_request_id)
            .await?
            .ok_or(AccessError::Unauthorized)?;
        let event = self.event(&membership.event_id).await?;

        if guest.status != GuestStatus::Approved {
            return Err(AccessError::NotApproved);
        }
        if event.requires_payment && !guest.is_paid() {
            return Err(AccessError::NotPaid);
        }

        let (token, _) = self
            .tokens
            .issue_for(&self.store, &event.id, &guest.id, self.clock.now())
            .await?;
        Ok(QrGrant { token, guest, event })
    }

    /// Record the guest's own attendance plan.
    ///
    /// Only approved guests, or guests who earlier reported
    /// [`GuestEventStatus::CantMake`], may report. `CantMake` revokes the
    /// access grant; reporting anything else afterwards restores the guest
    /// to `APPROVED` and lifts the revocation, so the current QR code scans
    /// again.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The membership's guest request no longer exists → [`AccessError::Unauthorized`]
    /// - The guest is in any other status → [`AccessError::NotApproved`]
    /// - A store operation fails
    pub async fn set_event_status(
        &self,
        membership: &GuestMembership,
        event_status: GuestEventStatus,
    ) -> Result<GuestRecord> {
        let event_id = &membership.event_id;
        let guest = self
            .store
            .find_guest(event_id, &membership.guest_request_id)
            .await?
            .ok_or(AccessError::Unauthorized)?;
        if !matches!(guest.status, GuestStatus::Approved | GuestStatus::CantMake) {
            return Err(AccessError::NotApproved);
        }

        let now = self.clock.now();
        if !self
            .store
            .record_event_status(event_id, &guest.id, event_status, now)
            .await?
        {
            return Err(AccessError::GuestNotFound);
        }

        match (guest.status, event_status) {
            (_, GuestEventStatus::CantMake) => {
                self.store.revoke_for_guest(event_id, &guest.id, now).await?;
            }
            (GuestStatus::CantMake, _) => {
                self.store.restore_for_guest(event_id, &guest.id).await?;
            }
            _ => {}
        }
        tracing::info!(event_id = %event_id, guest_request_id = %guest.id, %event_status, "Guest reported event status");

        Ok(GuestRecord {
            status: event_status.guest_status(),
            event_status: Some(event_status),
            event_status_at: Some(now),
            ..guest
        })
    }

    /// Apply a host decision. Only the event owner may do this.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The caller is not the owner → [`AccessError::Unauthorized`]
    /// - The guest request does not exist → [`AccessError::GuestNotFound`]
    /// - A store operation fails
    pub async fn apply(
        &self,
        access: &EventAccess,
        guest_request_id: &GuestRequestId,
        action: GuestAction,
    ) -> Result<()> {
        if !access.is_owner() {
            return Err(AccessError::Unauthorized);
        }
        let event_id = access.event_id();

        match action {
            GuestAction::Approve => self.approve(event_id, guest_request_id).await.map(|_| ()),
            GuestAction::Reject => self.set_status(event_id, guest_request_id, GuestStatus::Rejected).await,
            GuestAction::Revoke => self.revoke(event_id, guest_request_id).await,
            GuestAction::MarkPaid => self.mark_paid(event_id, guest_request_id).await,
            GuestAction::MarkCantMake => {
                self.set_status(event_id, guest_request_id, GuestStatus::CantMake)
                    .await
            }
        }
    }

    /// Approve a guest and issue their first access token.
    ///
    /// The raw token is discarded; the guest obtains one through
    /// [`issue_qr`](Self::issue_qr), which rotates it.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::GuestNotFound`] for an unknown guest, or the
    /// store error.
    pub async fn approve(
        &self,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
    ) -> Result<GuestAccessRecord> {
        self.set_status(event_id, guest_request_id, GuestStatus::Approved)
            .await?;
        let (_, grant) = self
            .tokens
            .issue_for(&self.store, event_id, guest_request_id, self.clock.now())
            .await?;
        Ok(grant)
    }

    /// Revoke a guest and their access grant.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::GuestNotFound`] for an unknown guest, or the
    /// store error.
    pub async fn revoke(&self, event_id: &EventId, guest_request_id: &GuestRequestId) -> Result<()> {
        self.set_status(event_id, guest_request_id, GuestStatus::Revoked)
            .await?;
        let had_grant = self
            .store
            .revoke_for_guest(event_id, guest_request_id, self.clock.now())
            .await?;
        tracing::info!(event_id = %event_id, guest_request_id = %guest_request_id, had_grant, "Guest revoked");
        Ok(())
    }

    /// Record that a guest has paid.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::GuestNotFound`] for an unknown guest, or the
    /// store error.
    pub async fn mark_paid(&self, event_id: &EventId, guest_request_id: &GuestRequestId) -> Result<()> {
        let found = self
            .store
            .confirm_payment(event_id, guest_request_id, self.clock.now())
            .await?;
        if !found {
            return Err(AccessError::GuestNotFound);
        }
        tracing::info!(event_id = %event_id, guest_request_id = %guest_request_id, "Payment confirmed");
        Ok(())
    }

    async fn set_status(
        &self,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
        status: GuestStatus,
    ) -> Result<()> {
        if !self.store.set_status(event_id, guest_request_id, status).await? {
            return Err(AccessError::GuestNotFound);
        }
        tracing::info!(event_id = %event_id, guest_request_id = %guest_request_id, %status, "Guest status changed");
        Ok(())
    }

    async fn event(&self, event_id: &EventId) -> Result<EventRecord> {
        self.store
            .find_event(event_id)
            .await?
            .ok_or(AccessError::EventNotFound)
    }
}
