//! Door check-in.
//!
//! [`CheckInLedger`] records that an access grant entered, exactly once.
//! It never asks "has this grant already checked in?" before writing: two
//! scanners reading the same QR code a few milliseconds apart would both see
//! "no" and both insert. Instead it inserts unconditionally and lets the
//! store's `(event, access grant)` uniqueness constraint pick the winner; the
//! loser's [`StoreError::UniqueViolation`](crate::StoreError::UniqueViolation)
//! becomes [`EntryOutcome::AlreadyCheckedIn`].
//!
//! [`CheckInService`] runs the preconditions (token, revocation, approval,
//! payment) in a fixed order, each with its own [`CheckinResult`], before it
//! calls the ledger.

use crate::error::{AccessError, Result};
use crate::providers::{AccessStore, CheckinStore, EventRecord, NewCheckin};
use crate::resolver::EventAccess;
use crate::token::AccessTokenService;
use guestgate_core::environment::Clock;
use guestgate_core::{AccessId, EventId, GuestStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Terminal result of a check-in attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckinResult {
    /// Token missing or matching no grant at this event.
    InvalidToken,
    /// Grant or guest revoked.
    Revoked,
    /// Guest not approved.
    NotApproved,
    /// Payment required and not confirmed.
    NotPaid,
    /// Re-scan of a guest already inside.
    AlreadyCheckedIn,
    /// Guest checked in.
    CheckedIn,
    /// Caller may not scan at this event.
    Unauthorized,
    /// Caller throttled.
    RateLimited,
}

impl CheckinResult {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidToken => "INVALID_TOKEN",
            Self::Revoked => "REVOKED",
            Self::NotApproved => "NOT_APPROVED",
            Self::NotPaid => "NOT_PAID",
            Self::AlreadyCheckedIn => "ALREADY_CHECKED_IN",
            Self::CheckedIn => "CHECKED_IN",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::RateLimited => "RATE_LIMITED",
        }
    }

    /// `CHECKED_IN` or `ALREADY_CHECKED_IN`.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::CheckedIn | Self::AlreadyCheckedIn)
    }
}

/// Outcome of [`CheckInLedger::record_entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    /// This call created the record.
    CheckedIn,
    /// A record already existed.
    AlreadyCheckedIn,
}

impl From<EntryOutcome> for CheckinResult {
    fn from(outcome: EntryOutcome) -> Self {
        match outcome {
            EntryOutcome::CheckedIn => Self::CheckedIn,
            EntryOutcome::AlreadyCheckedIn => Self::AlreadyCheckedIn,
        }
    }
}

/// Door totals for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinCounters {
    /// Check-ins recorded.
    pub checked_in: u64,
    /// Approved guests.
    pub approved: u64,
    /// `capacity - checked_in`, floored at zero; `None` when uncapped.
    pub remaining_capacity: Option<u64>,
}

/// Outcome of [`CheckInService::check_in`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckinReport {
    /// Result code.
    pub result: CheckinResult,
    /// Human-readable message for the scanner UI.
    pub message: String,
    /// Guest display name, once the token resolved to a guest.
    pub guest_name: Option<String>,
    /// Door totals, on success.
    pub counters: Option<CheckinCounters>,
    /// The request carried no token at all, as opposed to one that matched
    /// nothing.
    pub missing_token: bool,
}

impl CheckinReport {
    fn rejected(result: CheckinResult, message: &str, guest_name: Option<String>) -> Self {
        Self {
            result,
            message: message.to_string(),
            guest_name,
            counters: None,
            missing_token: false,
        }
    }
}

/// Idempotent record of physical entry.
#[derive(Clone)]
pub struct CheckInLedger<C> {
    store: C,
    clock: Arc<dyn Clock>,
}

impl<C: CheckinStore> CheckInLedger<C> {
    /// Create a ledger writing to `store`.
    pub fn new(store: C, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Record that `access_id` entered `event_id`.
    ///
    /// # Errors
    ///
    /// Returns the store error for any failure other than the uniqueness
    /// violation, which is reported as [`EntryOutcome::AlreadyCheckedIn`].
    pub async fn record_entry(
        &self,
        event_id: &EventId,
        access_id: &AccessId,
        actor: &str,
    ) -> Result<EntryOutcome> {
        let checkin = NewCheckin {
            event_id: event_id.clone(),
            access_id: access_id.clone(),
            checked_in_by: actor.to_string(),
            checked_in_at: self.clock.now(),
        };

        match self.store.insert_checkin(checkin).await {
            Ok(record) => {
                tracing::info!(
                    event_id = %event_id,
                    access_id = %access_id,
                    checkin_id = %record.id,
                    actor,
                    "Check-in recorded"
                );
                Ok(EntryOutcome::CheckedIn)
            }
            Err(error) if error.is_unique_violation() => {
                tracing::info!(event_id = %event_id, access_id = %access_id, actor, "Duplicate scan");
                Ok(EntryOutcome::AlreadyCheckedIn)
            }
            Err(error) => {
                tracing::error!(event_id = %event_id, access_id = %access_id, %error, "Check-in insert failed");
                Err(error)
            }
        }
    }
}

/// Check-in with all preconditions.
#[derive(Clone)]
pub struct CheckInService<S> {
    store: S,
    ledger: CheckInLedger<S>,
    tokens: AccessTokenService,
}

impl<S: AccessStore> CheckInService<S> {
    /// Create a service over `store`.
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: CheckInLedger::new(store.clone(), clock),
            store,
            tokens: AccessTokenService::new(),
        }
    }

    /// Check in the guest holding `raw_token`.
    ///
    /// `access` must come from
    /// [`EventAccessResolver`](crate::resolver::EventAccessResolver) for the
    /// event being scanned. Scanners additionally need the owner's plan to
    /// include staff scanners, checked live on every scan.
    ///
    /// Precondition failures are reported in the returned
    /// [`CheckinReport`], never as errors.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The caller is a scanner and the owner lacks the entitlement →
    ///   [`AccessError::EntitlementRequired`]
    /// - The event no longer exists → [`AccessError::EventNotFound`]
    /// - A store operation fails
    pub async fn check_in(&self, access: &EventAccess, raw_token: &str) -> Result<CheckinReport> {
        let event_id = access.event_id();
        if !access.is_owner() {
            self.require_entitlement(access).await?;
        }
        let event = self
            .store
            .find_event(event_id)
            .await?
            .ok_or(AccessError::EventNotFound)?;

        let raw_token = raw_token.trim();
        if raw_token.is_empty() {
            return Ok(CheckinReport {
                missing_token: true,
                ..CheckinReport::rejected(CheckinResult::InvalidToken, "Missing QR token.", None)
            });
        }

        let token_hash = self.tokens.hash(raw_token);
        let Some(grant) = self.store.find_by_token_hash(&token_hash).await? else {
            tracing::warn!(event_id = %event_id, hash_prefix = token_hash.prefix(), "Unknown token");
            return Ok(CheckinReport::rejected(
                CheckinResult::InvalidToken,
                "Invalid QR token.",
                None,
            ));
        };

        let guest = if &grant.event_id == event_id {
            self.store.find_guest(event_id, &grant.guest_request_id).await?
        } else {
            None
        };
        let Some(guest) = guest else {
            tracing::warn!(event_id = %event_id, access_id = %grant.id, "Token belongs to another event");
            return Ok(CheckinReport::rejected(
                CheckinResult::InvalidToken,
                "Token does not match this event.",
                None,
            ));
        };

        let name = Some(guest.display_name.clone());
        if grant.is_revoked() || guest.status == GuestStatus::Revoked {
            return Ok(CheckinReport::rejected(
                CheckinResult::Revoked,
                "Guest access revoked.",
                name,
            ));
        }
        if guest.status != GuestStatus::Approved {
            return Ok(CheckinReport::rejected(
                CheckinResult::NotApproved,
                "Guest is not approved.",
                name,
            ));
        }
        if event.requires_payment && !guest.is_paid() {
            return Ok(CheckinReport::rejected(
                CheckinResult::NotPaid,
                "Payment has not been confirmed.",
                name,
            ));
        }

        let outcome = self
            .ledger
            .record_entry(event_id, &grant.id, &access.actor_label())
            .await?;
        let message = match outcome {
            EntryOutcome::CheckedIn => format!("Checked in: {}", guest.display_name),
            EntryOutcome::AlreadyCheckedIn => format!("{} already checked in.", guest.display_name),
        };

        Ok(CheckinReport {
            result: outcome.into(),
            message,
            guest_name: name,
            counters: Some(self.counters(&event).await?),
            missing_token: false,
        })
    }

    /// Door totals for the resolved event.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The owner's plan lacks staff scanners → [`AccessError::EntitlementRequired`]
    /// - The event no longer exists → [`AccessError::EventNotFound`]
    /// - A store query fails
    pub async fn stats(&self, access: &EventAccess) -> Result<CheckinCounters> {
        self.require_entitlement(access).await?;
        let event = self
            .store
            .find_event(access.event_id())
            .await?
            .ok_or(AccessError::EventNotFound)?;
        self.counters(&event).await
    }

    async fn require_entitlement(&self, access: &EventAccess) -> Result<()> {
        if self
            .store
            .owner_has_scanner_entitlement(access.owner_host_user_id())
            .await?
        {
            Ok(())
        } else {
            Err(AccessError::EntitlementRequired)
        }
    }

    async fn counters(&self, event: &EventRecord) -> Result<CheckinCounters> {
        let checked_in = self.store.count_for_event(&event.id).await?;
        let approved = self.store.count_approved(&event.id).await?;
        Ok(CheckinCounters {
            checked_in,
            approved,
            remaining_capacity: event
                .capacity
                .map(|capacity| u64::from(capacity).saturating_sub(checked_in)),
        })
    }
}
