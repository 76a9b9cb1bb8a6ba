//! Guest memberships carried in one signed cookie.
//!
//! A device can join several events. Each join adds a
//! [`GuestMembership`] to a list sealed in a single envelope (the
//! `eventrl_guest` cookie), one entry per event. Joining the same event
//! again replaces its entry instead of adding a second one.
//!
//! A tampered cookie reads as "no memberships". Nothing here ever returns a
//! partial list from an envelope that failed verification.

use crate::envelope::SignedEnvelopeCodec;
use chrono::{DateTime, Utc};
use guestgate_core::environment::Clock;
use guestgate_core::{EventId, GuestRequestId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One event a device has joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestMembership {
    /// Event joined.
    pub event_id: EventId,
    /// Guest request created by the join.
    pub guest_request_id: GuestRequestId,
    /// When this entry was written.
    pub issued_at: DateTime<Utc>,
}

impl GuestMembership {
    fn is_complete(&self) -> bool {
        !self.event_id.is_empty() && !self.guest_request_id.is_empty()
    }
}

#[derive(Serialize)]
struct MembershipPayload<'a> {
    memberships: &'a [GuestMembership],
}

/// What to do with the membership cookie after a removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipCookie {
    /// Write this envelope.
    Set(String),
    /// Expire the cookie.
    Cleared,
}

/// Reads and rewrites the membership envelope.
#[derive(Clone)]
pub struct GuestMembershipStore {
    codec: SignedEnvelopeCodec,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for GuestMembershipStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestMembershipStore")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl GuestMembershipStore {
    /// Create a store signing with `codec`.
    #[must_use]
    pub fn new(codec: SignedEnvelopeCodec, clock: Arc<dyn Clock>) -> Self {
        Self { codec, clock }
    }

    /// Decode an envelope. `None` when it is tampered.
    fn decode(&self, envelope: Option<&str>) -> Option<Vec<GuestMembership>> {
        let opened = self.codec.open::<serde_json::Value>(envelope);
        if opened.tampered {
            return None;
        }
        let Some(mut value) = opened.payload else {
            return Some(Vec::new());
        };

        let items = match value.get_mut("memberships").map(serde_json::Value::take) {
            Some(serde_json::Value::Array(items)) => items,
            _ => return Some(Vec::new()),
        };

        // Entries that don't parse, or have an empty field, are skipped.
        Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value::<GuestMembership>(item).ok())
                .filter(GuestMembership::is_complete)
                .collect(),
        )
    }

    fn encode(&self, memberships: &[GuestMembership]) -> Option<String> {
        self.codec.seal(&MembershipPayload { memberships })
    }

    /// Add a membership for `event_id`, replacing any existing one.
    ///
    /// A tampered `existing` envelope is discarded. Returns `None` when
    /// sealing is unavailable; callers must fail the request rather than
    /// proceed without a cookie.
    pub fn add_or_replace(
        &self,
        existing: Option<&str>,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
    ) -> Option<String> {
        let mut memberships = self.decode(existing).unwrap_or_default();
        memberships.retain(|membership| &membership.event_id != event_id);
        memberships.push(GuestMembership {
            event_id: event_id.clone(),
            guest_request_id: guest_request_id.clone(),
            issued_at: self.clock.now(),
        });

        let sealed = self.encode(&memberships);
        if sealed.is_none() {
            tracing::error!(event_id = %event_id, "Guest membership signing is not configured");
        }
        sealed
    }

    /// Remove the membership for `event_id`.
    ///
    /// Clears the cookie when the envelope is tampered, when nothing is
    /// left, or when the remainder cannot be sealed.
    #[must_use]
    pub fn remove(&self, existing: Option<&str>, event_id: &EventId) -> MembershipCookie {
        let Some(mut memberships) = self.decode(existing) else {
            return MembershipCookie::Cleared;
        };
        memberships.retain(|membership| &membership.event_id != event_id);
        if memberships.is_empty() {
            return MembershipCookie::Cleared;
        }
        self.encode(&memberships)
            .map_or(MembershipCookie::Cleared, MembershipCookie::Set)
    }

    /// Forget every membership.
    #[must_use]
    pub const fn clear(&self) -> MembershipCookie {
        MembershipCookie::Cleared
    }

    /// All memberships; empty when the envelope is tampered.
    #[must_use]
    pub fn list_all(&self, envelope: Option<&str>) -> Vec<GuestMembership> {
        self.decode(envelope).unwrap_or_default()
    }

    /// The membership for one event.
    #[must_use]
    pub fn get_for_event(&self, envelope: Option<&str>, event_id: &EventId) -> Option<GuestMembership> {
        self.list_all(envelope)
            .into_iter()
            .find(|membership| &membership.event_id == event_id)
    }

    /// Pick the membership a request refers to.
    ///
    /// With an explicit event, that event's membership. Without one, the
    /// only membership if there is exactly one; otherwise `None`, and the
    /// caller has to ask which event is meant.
    #[must_use]
    pub fn select(&self, envelope: Option<&str>, event_id: Option<&EventId>) -> Option<GuestMembership> {
        if let Some(event_id) = event_id {
            return self.get_for_event(envelope, event_id);
        }
        let mut memberships = self.list_all(envelope);
        if memberships.len() == 1 {
            memberships.pop()
        } else {
            None
        }
    }
}
