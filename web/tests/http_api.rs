//! End-to-end HTTP tests against the in-memory store.

#![allow(clippy::unwrap_used, clippy::panic)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use guestgate_access::mocks::MockAccessStore;
use guestgate_access::providers::EventRecord;
use guestgate_access::{AccessConfig, AccessEnvironment};
use guestgate_core::{EventId, HostUserId};
use guestgate_testing::ManualClock;
use guestgate_web::extractors::{HOST_USER_EMAIL_HEADER, HOST_USER_ID_HEADER};
use guestgate_web::{router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> (Router, MockAccessStore) {
    let store = MockAccessStore::new();
    store.insert_event(EventRecord {
        id: EventId::from("evt1"),
        name: "Launch".to_string(),
        host_user_id: HostUserId::from("host1"),
        capacity: Some(10),
        requires_payment: false,
        scanner_access_code: Some("123456".to_string()),
    });
    let env = AccessEnvironment::with_clock(
        store.clone(),
        AccessConfig::new()
            .with_guest_secret("guest-secret")
            .with_secure_cookies(false),
        Arc::new(ManualClock::at_test_epoch()),
    );
    (router(AppState::new(env)), store)
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn delete(uri: &str, body: &Value) -> Request<Body> {
    Request::delete(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_cookies(mut request: Request<Body>, cookies: &[String]) -> Request<Body> {
    if !cookies.is_empty() {
        request
            .headers_mut()
            .insert(header::COOKIE, cookies.join("; ").parse().unwrap());
    }
    request
}

fn as_host(mut request: Request<Body>) -> Request<Body> {
    request
        .headers_mut()
        .insert(HOST_USER_ID_HEADER, "host1".parse().unwrap());
    request
}

/// `name=value` pairs from the response's non-expiring `Set-Cookie` headers.
fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap())
        .filter(|value| !value.contains("Max-Age=0"))
        .map(|value| value.split(';').next().unwrap().to_string())
        .collect()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Join and approve as host. Returns the guest's membership cookies.
async fn approved_guest(app: &Router, name: &str) -> Vec<String> {
    let response = app
        .clone()
        .oneshot(post("/api/guest/join/evt1", &json!({ "displayName": name })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let cookies = set_cookies(&response);
    let guest = json_body(response).await;
    let guest_id = guest["guestRequestId"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(as_host(post(
            &format!("/api/host/events/evt1/guests/{guest_id}"),
            &json!({ "action": "APPROVE" }),
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    cookies
}

async fn fetch_qr(app: &Router, cookies: &[String]) -> Response {
    let request = Request::get("/api/guest/qr?event=evt1").body(Body::empty()).unwrap();
    app.clone().oneshot(with_cookies(request, cookies)).await.unwrap()
}

/// Join, approve as host, fetch a QR code. Returns the raw token.
async fn approved_token(app: &Router) -> String {
    let cookies = approved_guest(app, "Ada Lovelace").await;
    let response = fetch_qr(app, &cookies).await;
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await["token"].as_str().unwrap().to_string()
}


#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_join_sets_membership_cookie() {
    let (app, _) = app();
    let response = app
        .clone()
        .oneshot(post("/api/guest/join/evt1", &json!({ "displayName": "  Ada  " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["x-ratelimit-limit"], "12");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "11");
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with("eventrl_guest="));

    let body = json_body(response).await;
    assert_eq!(body["displayName"], "Ada");
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["recoveryCode"].as_str().unwrap().len(), 5);

    let request = Request::get("/api/guest/memberships").body(Body::empty()).unwrap();
    let response = app.oneshot(with_cookies(request, &cookies)).await.unwrap();
    let body = json_body(response).await;
    assert_eq!(body["memberships"][0]["eventId"], "evt1");
}

#[tokio::test]
async fn test_join_unknown_event_is_not_found() {
    let (app, _) = app();
    let response = app
        .oneshot(post("/api/guest/join/nope", &json!({ "displayName": "Ada" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn test_join_rate_limited_before_body_parsing() {
    let (app, _) = app();
    for _ in 0..12 {
        let response = app
            .clone()
            .oneshot(Request::post("/api/guest/join/evt1").body(Body::from("not json")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = app
        .oneshot(post("/api/guest/join/evt1", &json!({ "displayName": "Ada" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    assert_eq!(response.headers()["retry-after"], "60");
    assert_eq!(json_body(response).await["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn test_qr_without_membership_is_unauthorized() {
    let (app, _) = app();
    let response = app
        .oneshot(Request::get("/api/guest/qr").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_host_checks_in_once() {
    let (app, store) = app();
    let token = approved_token(&app).await;

    let response = app
        .clone()
        .oneshot(as_host(post("/api/host/events/evt1/checkin", &json!({ "token": token }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["result"], "CHECKED_IN");
    assert_eq!(body["guestName"], "Ada Lovelace");
    assert_eq!(body["checkedIn"], 1);
    assert_eq!(body["approved"], 1);
    assert_eq!(body["remainingCapacity"], 9);

    let response = app
        .oneshot(as_host(post("/api/host/events/evt1/checkin", &json!({ "token": token }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["result"], "ALREADY_CHECKED_IN");
    assert_eq!(store.checkin_count(), 1);
}

#[tokio::test]
async fn test_checkin_rejections() {
    let (app, _) = app();

    let response = app
        .clone()
        .oneshot(post("/api/host/events/evt1/checkin", &json!({ "token": "abc" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["result"], "UNAUTHORIZED");

    let response = app
        .clone()
        .oneshot(as_host(post("/api/host/events/evt1/checkin", &json!({ "token": "  " }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["message"], "Missing QR token.");

    let response = app
        .oneshot(as_host(post("/api/host/events/evt1/checkin", &json!({ "token": "abc" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["result"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_scanner_device_flow() {
    let (app, store) = app();
    let token = approved_token(&app).await;

    let verify = json!({ "action": "verify", "accessCode": "123456" });
    let response = app
        .clone()
        .oneshot(post("/api/scanner/access/evt1", &verify))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["code"], "ENTITLEMENT_REQUIRED");

    store.set_entitlement(&HostUserId::from("host1"), true);

    let response = app
        .clone()
        .oneshot(post("/api/scanner/access/evt1", &json!({ "action": "verify", "accessCode": "654321" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["code"], "SCANNER_INVALID_CODE");

    let response = app
        .clone()
        .oneshot(post("/api/scanner/access/evt1", &verify))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let gate = set_cookies(&response);
    assert!(gate[0].starts_with("eventrl_scanner_gate="));
    assert_eq!(json_body(response).await["stage"], "identity");

    let activate = json!({ "action": "activate", "scannerName": "North door" });
    let response = app
        .clone()
        .oneshot(post("/api/scanner/access/evt1", &activate))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(with_cookies(post("/api/scanner/access/evt1", &activate), &gate))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session = set_cookies(&response);
    assert_eq!(session.len(), 1);
    assert!(session[0].starts_with("eventrl_scanner="));
    assert_eq!(json_body(response).await["scannerName"], "North door");

    let response = app
        .clone()
        .oneshot(with_cookies(
            post("/api/host/events/evt1/checkin", &json!({ "token": token })),
            &session,
        ))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["result"], "CHECKED_IN");
    assert_eq!(store.checkins()[0].checked_in_by, "scanner:North door");

    let request = Request::get("/api/host/events/evt1/checkin-stats").body(Body::empty()).unwrap();
    let response = app.oneshot(with_cookies(request, &session)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["checkedIn"], 1);
}

#[tokio::test]
async fn test_guest_action_requires_owner() {
    let (app, _) = app();
    let response = app
        .clone()
        .oneshot(post("/api/guest/join/evt1", &json!({ "displayName": "Ada" })))
        .await
        .unwrap();
    let guest_id = json_body(response).await["guestRequestId"].as_str().unwrap().to_string();
    let uri = format!("/api/host/events/evt1/guests/{guest_id}");

    let response = app
        .clone()
        .oneshot(post(&uri, &json!({ "action": "APPROVE" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(as_host(post(&uri, &json!({ "action": "DANCE" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkin_throttle_reports_rate_limited() {
    let (app, _) = app();
    let scan = || as_host(post("/api/host/events/evt1/checkin", &json!({ "token": "abc" })));

    for _ in 0..120 {
        let response = app.clone().oneshot(scan()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    let response = app.oneshot(scan()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["x-ratelimit-limit"], "120");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    assert_eq!(response.headers()["retry-after"], "60");
    let body = json_body(response).await;
    assert_eq!(body["result"], "RATE_LIMITED");
    assert_eq!(body["message"], "Too many scans. Try again in a moment.");
}

#[tokio::test]
async fn test_checkin_budgets_are_per_caller() {
    let (app, store) = app();
    let token = approved_token(&app).await;

    for _ in 0..120 {
        let response = app
            .clone()
            .oneshot(post("/api/host/events/evt1/checkin", &json!({ "token": "abc" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    let response = app
        .clone()
        .oneshot(post("/api/host/events/evt1/checkin", &json!({ "token": "abc" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let response = app
        .oneshot(as_host(post("/api/host/events/evt1/checkin", &json!({ "token": token }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "119");
    assert_eq!(json_body(response).await["result"], "CHECKED_IN");
    assert_eq!(store.checkin_count(), 1);
}

#[tokio::test]
async fn test_qr_budgets_are_per_guest() {
    let (app, _) = app();
    let ada = approved_guest(&app, "Ada").await;
    let bob = approved_guest(&app, "Bob").await;

    for _ in 0..30 {
        assert_eq!(fetch_qr(&app, &ada).await.status(), StatusCode::OK);
    }
    let response = fetch_qr(&app, &ada).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json_body(response).await["code"], "RATE_LIMITED");

    let response = fetch_qr(&app, &bob).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["displayName"], "Bob");
}

#[tokio::test]
async fn test_scanner_code_attempts_are_throttled() {
    let (app, store) = app();
    store.set_entitlement(&HostUserId::from("host1"), true);

    let wrong = json!({ "action": "verify", "accessCode": "654321" });
    for _ in 0..15 {
        let response = app
            .clone()
            .oneshot(post("/api/scanner/access/evt1", &wrong))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    let right = json!({ "action": "verify", "accessCode": "123456" });
    let response = app
        .oneshot(post("/api/scanner/access/evt1", &right))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["x-ratelimit-limit"], "15");
    assert!(set_cookies(&response).is_empty());
    assert_eq!(json_body(response).await["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn test_owner_manages_staff_scanners() {
    let (app, store) = app();
    store.set_entitlement(&HostUserId::from("host1"), true);
    let token = approved_token(&app).await;
    let role = json!({ "scannerEmail": " Door@Example.com " });
    let staff = |mut request: Request<Body>| {
        let headers = request.headers_mut();
        headers.insert(HOST_USER_ID_HEADER, "staff1".parse().unwrap());
        headers.insert(HOST_USER_EMAIL_HEADER, "door@example.com".parse().unwrap());
        request
    };

    let response = app
        .clone()
        .oneshot(post("/api/host/events/evt1/scanners", &role))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(as_host(post("/api/host/events/evt1/scanners", &role)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["scannerEmail"], "door@example.com");
    assert_eq!(body["status"], "ACTIVE");

    let response = app
        .clone()
        .oneshot(staff(post("/api/host/events/evt1/checkin", &json!({ "token": token }))))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["result"], "CHECKED_IN");
    assert_eq!(store.checkins()[0].checked_in_by, "staff:door@example.com");

    let response = app
        .clone()
        .oneshot(as_host(delete("/api/host/events/evt1/scanners", &role)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["revoked"], true);

    let request = Request::get("/api/host/events/evt1/checkin-stats").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(staff(request)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(as_host(post("/api/host/events/evt1/scanners", &json!({ "scannerEmail": "nobody" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_guest_cant_make_round_trip() {
    let (app, _) = app();
    let cookies = approved_guest(&app, "Ada").await;
    let token = json_body(fetch_qr(&app, &cookies).await).await["token"]
        .as_str()
        .unwrap()
        .to_string();
    let report = |status: &str| {
        with_cookies(
            post("/api/guest/event-status", &json!({ "eventId": "evt1", "status": status })),
            &cookies,
        )
    };
    let scan = || as_host(post("/api/host/events/evt1/checkin", &json!({ "token": token })));

    let response = app.clone().oneshot(report("CANT_MAKE")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "CANT_MAKE");
    assert_eq!(body["eventStatus"], "CANT_MAKE");

    let response = app.clone().oneshot(scan()).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["result"], "REVOKED");

    let response = app.clone().oneshot(report("ARRIVING")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "APPROVED");

    let response = app.clone().oneshot(scan()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["result"], "CHECKED_IN");

    let response = app.clone().oneshot(report("MAYBE")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post("/api/guest/event-status", &json!({ "eventId": "evt1", "status": "ARRIVING" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
