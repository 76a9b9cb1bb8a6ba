//! Guest joins, host approves, guest fetches a QR code, staff scan it.

#![allow(clippy::unwrap_used, clippy::panic)]

use chrono::Duration;
use guestgate_access::mocks::MockAccessStore;
use guestgate_access::providers::{EventRecord, ScannerRoleRepository, ScannerRoleStatus};
use guestgate_access::resolver::{AuthenticatedUser, ScannerIdentity};
use guestgate_access::scanner::CookieUpdate;
use guestgate_access::{
    AccessConfig, AccessEnvironment, AccessError, Caller, CheckinResult, GuestAction, GuestMembership,
};
use guestgate_core::{EventId, GuestStatus, HostUserId};
use guestgate_testing::{ManualClock, test_epoch};
use std::sync::Arc;

struct Door {
    store: MockAccessStore,
    clock: Arc<ManualClock>,
    env: AccessEnvironment<MockAccessStore>,
}

fn door(requires_payment: bool) -> Door {
    let store = MockAccessStore::new();
    store.insert_event(EventRecord {
        id: EventId::from("evt1"),
        name: "Launch".to_string(),
        host_user_id: HostUserId::from("host1"),
        capacity: Some(2),
        requires_payment,
        scanner_access_code: Some("123456".to_string()),
    });
    let clock = Arc::new(ManualClock::at_test_epoch());
    let env = AccessEnvironment::with_clock(
        store.clone(),
        AccessConfig::new()
            .with_guest_secret("guest-secret")
            .with_scanner_secret("scanner-secret"),
        clock.clone(),
    );
    Door { store, clock, env }
}

fn host() -> Caller {
    Caller {
        host_user: Some(AuthenticatedUser {
            id: HostUserId::from("host1"),
            email: Some("host@example.com".to_string()),
        }),
        scanner_session: None,
    }
}

#[tokio::test]
async fn test_join_approve_scan_twice() {
    let d = door(false);
    let event_id = EventId::from("evt1");

    let guest = d.env.guests().join(&event_id, "Ada Lovelace").await.unwrap();
    let cookie = d
        .env
        .memberships
        .add_or_replace(None, &guest.event_id, &guest.id)
        .unwrap();
    let membership: GuestMembership = d.env.memberships.select(Some(&cookie), None).unwrap();

    let owner = d.env.resolver().require(&event_id, &host()).await.unwrap();
    d.env
        .guests()
        .apply(&owner, &guest.id, GuestAction::Approve)
        .await
        .unwrap();
    let qr = d.env.guests().issue_qr(&membership).await.unwrap();

    let first = d.env.checkins().check_in(&owner, &qr.token.raw_token).await.unwrap();
    assert_eq!(first.result, CheckinResult::CheckedIn);
    assert_eq!(first.message, "Checked in: Ada Lovelace");
    let counters = first.counters.unwrap();
    assert_eq!(counters.checked_in, 1);
    assert_eq!(counters.approved, 1);
    assert_eq!(counters.remaining_capacity, Some(1));

    let second = d.env.checkins().check_in(&owner, &qr.token.raw_token).await.unwrap();
    assert_eq!(second.result, CheckinResult::AlreadyCheckedIn);
    assert_eq!(d.store.checkin_count(), 1);
}

#[tokio::test]
async fn test_scanner_flow_with_access_code() {
    let d = door(false);
    let event_id = EventId::from("evt1");
    d.store.set_entitlement(&HostUserId::from("host1"), true);

    let guest = d.env.guests().join(&event_id, "Grace").await.unwrap();
    d.env.guests().approve(&event_id, &guest.id).await.unwrap();
    let qr = d
        .env
        .guests()
        .issue_qr(&GuestMembership {
            event_id: event_id.clone(),
            guest_request_id: guest.id.clone(),
            issued_at: guest.created_at,
        })
        .await
        .unwrap();

    let gate = d.env.scanner.verify_code(&event_id, " 123456 ", Some("123456")).unwrap();
    let activation = d.env.scanner.activate(Some(&gate), &event_id, "North door").unwrap();
    let CookieUpdate::Set(session_cookie) = activation.cookies.session else {
        panic!("expected a session cookie");
    };

    let caller = Caller {
        host_user: None,
        scanner_session: d.env.scanner.current_session(Some(&session_cookie)),
    };
    let access = d.env.resolver().require(&event_id, &caller).await.unwrap();
    assert_eq!(access.actor_label(), "scanner:North door");

    let report = d.env.checkins().check_in(&access, &qr.token.raw_token).await.unwrap();
    assert_eq!(report.result, CheckinResult::CheckedIn);
    assert_eq!(d.store.checkins()[0].checked_in_by, "scanner:North door");

    // Downgrading the host's plan stops scanners at the next scan.
    d.store.set_entitlement(&HostUserId::from("host1"), false);
    assert_eq!(
        d.env.checkins().check_in(&access, &qr.token.raw_token).await,
        Err(AccessError::EntitlementRequired)
    );

    // Sessions expire after fourteen days.
    d.clock.advance(Duration::days(14));
    assert!(d.env.scanner.current_session(Some(&session_cookie)).is_none());
}

#[tokio::test]
async fn test_staff_email_scanner() {
    let d = door(false);
    let event_id = EventId::from("evt1");
    d.store.set_entitlement(&HostUserId::from("host1"), true);
    d.store
        .grant_scanner_role(&event_id, "door@example.com", ScannerRoleStatus::Active);

    let staff = Caller {
        host_user: Some(AuthenticatedUser {
            id: HostUserId::from("staff1"),
            email: Some(" Door@Example.com ".to_string()),
        }),
        scanner_session: None,
    };
    let access = d.env.resolver().require(&event_id, &staff).await.unwrap();
    assert!(matches!(
        access,
        guestgate_access::EventAccess::Scanner {
            identity: ScannerIdentity::StaffEmail { .. },
            ..
        }
    ));

    d.store
        .revoke_scanner_role(&event_id, "door@example.com", test_epoch())
        .await
        .unwrap();
    assert_eq!(
        d.env.resolver().require(&event_id, &staff).await,
        Err(AccessError::Unauthorized)
    );
}

#[tokio::test]
async fn test_revoked_and_unpaid_guests_are_turned_away() {
    let d = door(true);
    let event_id = EventId::from("evt1");
    let owner = d.env.resolver().require(&event_id, &host()).await.unwrap();

    let guest = d.env.guests().join(&event_id, "Unpaid").await.unwrap();
    let grant = d.env.guests().approve(&event_id, &guest.id).await.unwrap();
    assert_eq!(
        d.env
            .guests()
            .issue_qr(&GuestMembership {
                event_id: event_id.clone(),
                guest_request_id: guest.id.clone(),
                issued_at: guest.created_at,
            })
            .await
            .unwrap_err(),
        AccessError::NotPaid
    );

    d.env.guests().mark_paid(&event_id, &guest.id).await.unwrap();
    let qr = d
        .env
        .guests()
        .issue_qr(&GuestMembership {
            event_id: event_id.clone(),
            guest_request_id: guest.id.clone(),
            issued_at: guest.created_at,
        })
        .await
        .unwrap();
    assert_eq!(d.store.grant(&guest.id).unwrap().id, grant.id);

    d.env
        .guests()
        .apply(&owner, &guest.id, GuestAction::Revoke)
        .await
        .unwrap();
    let report = d.env.checkins().check_in(&owner, &qr.token.raw_token).await.unwrap();
    assert_eq!(report.result, CheckinResult::Revoked);
    assert_eq!(d.store.guest(&guest.id).unwrap().status, GuestStatus::Revoked);
    assert_eq!(d.store.checkin_count(), 0);
}

#[tokio::test]
async fn test_recovery_restores_membership_on_new_device() {
    let d = door(false);
    let event_id = EventId::from("evt1");

    let guest = d.env.guests().join(&event_id, "Ada").await.unwrap();
    let code = guest.recovery_code.clone().unwrap();

    let recovered = d.env.guests().recover(&event_id, &code).await.unwrap();
    let cookie = d
        .env
        .memberships
        .add_or_replace(None, &recovered.event_id, &recovered.id)
        .unwrap();

    let membership = d.env.memberships.get_for_event(Some(&cookie), &event_id).unwrap();
    assert_eq!(membership.guest_request_id, guest.id);
}
