//! In-memory access store.

use crate::error::{Result, StoreError};
use crate::providers::{
    CheckinRecord, CheckinStore, EventDirectory, EventRecord, GuestAccessRecord,
    GuestAccessRepository, GuestRecord, GuestRepository, NewCheckin, NewGuestRequest, ScannerRole,
    ScannerRoleRepository, ScannerRoleStatus,
};
use crate::token::TokenHash;
use chrono::{DateTime, Utc};
use guestgate_core::{AccessId, EventId, GuestEventStatus, GuestRequestId, GuestStatus, HostUserId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct State {
    events: HashMap<EventId, EventRecord>,
    entitled_hosts: HashSet<HostUserId>,
    scanner_roles: Vec<ScannerRole>,
    guests: HashMap<GuestRequestId, GuestRecord>,
    grants: HashMap<GuestRequestId, GuestAccessRecord>,
    checkins: Vec<CheckinRecord>,
    /// Emulates `UNIQUE (event_id, guest_access_id)`.
    checkin_keys: HashSet<(EventId, AccessId)>,
    checkin_failure: Option<StoreError>,
    rejected_guest_creates: usize,
}

/// Mock store implementing every provider trait.
///
/// Clones share state, so a test can keep a handle for seeding and
/// inspection while services own their own copies. The check-in uniqueness
/// constraint is emulated with a set insert under the same lock as the
/// record append, which makes it atomic across concurrent tasks.
#[derive(Debug, Clone, Default)]
pub struct MockAccessStore {
    state: Arc<Mutex<State>>,
}

impl MockAccessStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add or replace an event.
    pub fn insert_event(&self, event: EventRecord) {
        self.state().events.insert(event.id.clone(), event);
    }

    /// Add or replace a guest request.
    pub fn insert_guest(&self, guest: GuestRecord) {
        self.state().guests.insert(guest.id.clone(), guest);
    }

    /// Grant or withdraw the staff-scanner entitlement for a host.
    pub fn set_entitlement(&self, host_user_id: &HostUserId, entitled: bool) {
        let mut state = self.state();
        if entitled {
            state.entitled_hosts.insert(host_user_id.clone());
        } else {
            state.entitled_hosts.remove(host_user_id);
        }
    }

    /// Seed a scanner role for `email` (stored normalized) in any status.
    pub fn grant_scanner_role(&self, event_id: &EventId, email: &str, status: ScannerRoleStatus) {
        let email = email.trim().to_lowercase();
        let mut state = self.state();
        state
            .scanner_roles
            .retain(|role| !(&role.event_id == event_id && role.scanner_email == email));
        state.scanner_roles.push(ScannerRole {
            event_id: event_id.clone(),
            scanner_email: email,
            status,
            revoked_at: None,
        });
    }

    /// Snapshot of a scanner role, active or not.
    #[must_use]
    pub fn scanner_role(&self, event_id: &EventId, email: &str) -> Option<ScannerRole> {
        self.state()
            .scanner_roles
            .iter()
            .find(|role| &role.event_id == event_id && role.scanner_email == email)
            .cloned()
    }

    /// Make every subsequent check-in insert fail with `error`.
    pub fn fail_checkins_with(&self, error: StoreError) {
        self.state().checkin_failure = Some(error);
    }

    /// Reject the next `n` guest-request creates as recovery-code collisions.
    pub fn reject_next_guest_creates(&self, n: usize) {
        self.state().rejected_guest_creates = n;
    }

    /// Snapshot of a guest request.
    #[must_use]
    pub fn guest(&self, guest_request_id: &GuestRequestId) -> Option<GuestRecord> {
        self.state().guests.get(guest_request_id).cloned()
    }

    /// Snapshot of a guest's access grant.
    #[must_use]
    pub fn grant(&self, guest_request_id: &GuestRequestId) -> Option<GuestAccessRecord> {
        self.state().grants.get(guest_request_id).cloned()
    }

    /// All check-in records, in insertion order.
    #[must_use]
    pub fn checkins(&self) -> Vec<CheckinRecord> {
        self.state().checkins.clone()
    }

    /// Number of check-in records.
    #[must_use]
    pub fn checkin_count(&self) -> usize {
        self.state().checkins.len()
    }
}

impl EventDirectory for MockAccessStore {
    async fn find_event(&self, event_id: &EventId) -> Result<Option<EventRecord>> {
        Ok(self.state().events.get(event_id).cloned())
    }

    async fn owner_has_scanner_entitlement(&self, host_user_id: &HostUserId) -> Result<bool> {
        Ok(self.state().entitled_hosts.contains(host_user_id))
    }

    async fn find_active_scanner_role(
        &self,
        event_id: &EventId,
        email: &str,
    ) -> Result<Option<ScannerRole>> {
        Ok(self
            .state()
            .scanner_roles
            .iter()
            .find(|role| &role.event_id == event_id && role.scanner_email == email && role.is_active())
            .cloned())
    }
}

impl ScannerRoleRepository for MockAccessStore {
    async fn activate_scanner_role(&self, event_id: &EventId, email: &str) -> Result<ScannerRole> {
        let mut state = self.state();
        if let Some(role) = state
            .scanner_roles
            .iter_mut()
            .find(|role| &role.event_id == event_id && role.scanner_email == email)
        {
            role.status = ScannerRoleStatus::Active;
            role.revoked_at = None;
            return Ok(role.clone());
        }

        let role = ScannerRole {
            event_id: event_id.clone(),
            scanner_email: email.to_string(),
            status: ScannerRoleStatus::Active,
            revoked_at: None,
        };
        state.scanner_roles.push(role.clone());
        Ok(role)
    }

    async fn revoke_scanner_role(
        &self,
        event_id: &EventId,
        email: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state();
        let Some(role) = state
            .scanner_roles
            .iter_mut()
            .find(|role| &role.event_id == event_id && role.scanner_email == email)
        else {
            return Ok(false);
        };
        role.status = ScannerRoleStatus::Revoked;
        role.revoked_at = Some(revoked_at);
        Ok(true)
    }
}

impl GuestRepository for MockAccessStore {
    async fn find_guest(
        &self,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
    ) -> Result<Option<GuestRecord>> {
        Ok(self
            .state()
            .guests
            .get(guest_request_id)
            .filter(|guest| &guest.event_id == event_id)
            .cloned())
    }

    async fn create_guest_request(&self, request: NewGuestRequest) -> Result<GuestRecord> {
        let mut state = self.state();
        if state.rejected_guest_creates > 0 {
            state.rejected_guest_creates -= 1;
            return Err(recovery_code_taken().into());
        }
        let taken = state.guests.values().any(|guest| {
            guest.event_id == request.event_id
                && guest.recovery_code.as_deref() == Some(request.recovery_code.as_str())
        });
        if taken {
            return Err(recovery_code_taken().into());
        }

        let guest = GuestRecord {
            id: GuestRequestId::generate(),
            event_id: request.event_id,
            display_name: request.display_name,
            status: request.status,
            payment_confirmed_at: None,
            recovery_code: Some(request.recovery_code),
            event_status: None,
            event_status_at: None,
            created_at: request.created_at,
        };
        state.guests.insert(guest.id.clone(), guest.clone());
        Ok(guest)
    }

    async fn find_by_recovery_code(
        &self,
        event_id: &EventId,
        recovery_code: &str,
    ) -> Result<Option<GuestRecord>> {
        Ok(self
            .state()
            .guests
            .values()
            .filter(|guest| {
                &guest.event_id == event_id && guest.recovery_code.as_deref() == Some(recovery_code)
            })
            .max_by_key(|guest| guest.created_at)
            .cloned())
    }

    async fn set_status(
        &self,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
        status: GuestStatus,
    ) -> Result<bool> {
        let mut state = self.state();
        match state.guests.get_mut(guest_request_id) {
            Some(guest) if &guest.event_id == event_id => {
                guest.status = status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn confirm_payment(
        &self,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
        confirmed_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state();
        match state.guests.get_mut(guest_request_id) {
            Some(guest) if &guest.event_id == event_id => {
                guest.payment_confirmed_at = Some(confirmed_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_event_status(
        &self,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
        event_status: GuestEventStatus,
        reported_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state();
        match state.guests.get_mut(guest_request_id) {
            Some(guest) if &guest.event_id == event_id => {
                guest.status = event_status.guest_status();
                guest.event_status = Some(event_status);
                guest.event_status_at = Some(reported_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count_approved(&self, event_id: &EventId) -> Result<u64> {
        let count = self
            .state()
            .guests
            .values()
            .filter(|guest| &guest.event_id == event_id && guest.status == GuestStatus::Approved)
            .count();
        Ok(count as u64)
    }
}

impl GuestAccessRepository for MockAccessStore {
    async fn upsert_token_hash(
        &self,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
        token_hash: &TokenHash,
        issued_at: DateTime<Utc>,
    ) -> Result<GuestAccessRecord> {
        let mut state = self.state();
        let grant = state
            .grants
            .entry(guest_request_id.clone())
            .and_modify(|grant| {
                grant.token_hash = token_hash.clone();
                grant.issued_at = issued_at;
                grant.revoked_at = None;
            })
            .or_insert_with(|| GuestAccessRecord {
                id: AccessId::generate(),
                event_id: event_id.clone(),
                guest_request_id: guest_request_id.clone(),
                token_hash: token_hash.clone(),
                issued_at,
                revoked_at: None,
            });
        Ok(grant.clone())
    }

    async fn find_by_token_hash(&self, token_hash: &TokenHash) -> Result<Option<GuestAccessRecord>> {
        Ok(self
            .state()
            .grants
            .values()
            .find(|grant| &grant.token_hash == token_hash)
            .cloned())
    }

    async fn revoke_for_guest(
        &self,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
        revoked_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state();
        match state.grants.get_mut(guest_request_id) {
            Some(grant) if &grant.event_id == event_id => {
                grant.revoked_at = Some(revoked_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn restore_for_guest(&self, event_id: &EventId, guest_request_id: &GuestRequestId) -> Result<bool> {
        let mut state = self.state();
        match state.grants.get_mut(guest_request_id) {
            Some(grant) if &grant.event_id == event_id => {
                grant.revoked_at = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl CheckinStore for MockAccessStore {
    async fn insert_checkin(&self, checkin: NewCheckin) -> Result<CheckinRecord> {
        let mut state = self.state();
        if let Some(error) = state.checkin_failure.clone() {
            return Err(error.into());
        }
        if !state
            .checkin_keys
            .insert((checkin.event_id.clone(), checkin.access_id.clone()))
        {
            return Err(StoreError::UniqueViolation {
                constraint: Some("checkins_event_access_unique".to_string()),
            }
            .into());
        }

        let record = CheckinRecord {
            id: format!("chk-{}", state.checkins.len() + 1),
            event_id: checkin.event_id,
            access_id: checkin.access_id,
            checked_in_by: checkin.checked_in_by,
            checked_in_at: checkin.checked_in_at,
        };
        state.checkins.push(record.clone());
        Ok(record)
    }

    async fn count_for_event(&self, event_id: &EventId) -> Result<u64> {
        let count = self
            .state()
            .checkins
            .iter()
            .filter(|checkin| &checkin.event_id == event_id)
            .count();
        Ok(count as u64)
    }
}

fn recovery_code_taken() -> StoreError {
    StoreError::UniqueViolation {
        constraint: Some("guest_requests_event_recovery_code_key".to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use guestgate_testing::test_epoch;

    fn new_request(code: &str) -> NewGuestRequest {
        NewGuestRequest {
            event_id: EventId::from("evt1"),
            display_name: "Ada".to_string(),
            recovery_code: code.to_string(),
            status: GuestStatus::Pending,
            created_at: test_epoch(),
        }
    }

    #[tokio::test]
    async fn test_recovery_code_is_unique_per_event() {
        let store = MockAccessStore::new();
        store.create_guest_request(new_request("12345")).await.unwrap();

        let err = store.create_guest_request(new_request("12345")).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_upsert_keeps_grant_id() {
        let store = MockAccessStore::new();
        let event = EventId::from("evt1");
        let guest = GuestRequestId::from("r1");

        let first = store
            .upsert_token_hash(&event, &guest, &TokenHash::from_stored("a".repeat(64)), test_epoch())
            .await
            .unwrap();
        store.revoke_for_guest(&event, &guest, test_epoch()).await.unwrap();
        let second = store
            .upsert_token_hash(&event, &guest, &TokenHash::from_stored("b".repeat(64)), test_epoch())
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.revoked_at.is_none());
        assert!(store
            .find_by_token_hash(&TokenHash::from_stored("a".repeat(64)))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_scanner_role_reactivation() {
        let store = MockAccessStore::new();
        let event = EventId::from("evt1");

        assert!(!store
            .revoke_scanner_role(&event, "door@example.com", test_epoch())
            .await
            .unwrap());
        store.activate_scanner_role(&event, "door@example.com").await.unwrap();
        assert!(store
            .revoke_scanner_role(&event, "door@example.com", test_epoch())
            .await
            .unwrap());
        assert!(store
            .find_active_scanner_role(&event, "door@example.com")
            .await
            .unwrap()
            .is_none());

        let role = store.activate_scanner_role(&event, "door@example.com").await.unwrap();
        assert!(role.is_active());
        assert_eq!(store.state().scanner_roles.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_checkin_is_unique_violation() {
        let store = MockAccessStore::new();
        let checkin = NewCheckin {
            event_id: EventId::from("evt1"),
            access_id: AccessId::from("a1"),
            checked_in_by: "host:h".to_string(),
            checked_in_at: test_epoch(),
        };

        store.insert_checkin(checkin.clone()).await.unwrap();
        let err = store.insert_checkin(checkin).await.unwrap_err();
        assert!(err.is_unique_violation());
        assert_eq!(store.count_for_event(&EventId::from("evt1")).await.unwrap(), 1);
    }
}
