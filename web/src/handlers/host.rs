//! Host-side endpoints: door check-in, door totals, guest moderation,
//! staff scanner roles.
//!
//! These endpoints accept either the event owner (identified by the
//! upstream identity headers) or a scanner (device session cookie or
//! staff email role). [`EventAccessResolver`](guestgate_access::EventAccessResolver)
//! decides which.

use super::parse_json;
use crate::cookies::read_cookie;
use crate::error::AppError;
use crate::extractors::{ClientIp, HostIdentity};
use crate::rate_limit::rate_limit_headers;
use crate::state::AppState;
use crate::WebResult;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use guestgate_access::constants::{cookies, limits};
use guestgate_access::providers::AccessStore;
use guestgate_access::{Caller, CheckinCounters, CheckinReport, CheckinResult, GuestAction};
use guestgate_core::{EventId, GuestRequestId};
use serde::{Deserialize, Serialize};

/// Check-in request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckinRequest {
    /// Raw token read from the guest's QR code.
    #[serde(default)]
    pub token: String,
}

/// Check-in response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinResponse {
    /// Result code.
    pub result: CheckinResult,
    /// Message for the scanner UI.
    pub message: String,
    /// Guest display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_name: Option<String>,
    /// Door totals, on success.
    #[serde(flatten)]
    pub counters: Option<CheckinCounters>,
    /// No token was sent; answered with 400 rather than 404.
    #[serde(skip)]
    pub missing_token: bool,
}

impl CheckinResponse {
    fn bare(result: CheckinResult, message: &str) -> Self {
        Self {
            result,
            message: message.to_string(),
            guest_name: None,
            counters: None,
            missing_token: false,
        }
    }

    fn status(&self) -> StatusCode {
        match self.result {
            CheckinResult::CheckedIn | CheckinResult::AlreadyCheckedIn => StatusCode::OK,
            CheckinResult::InvalidToken if self.missing_token => StatusCode::BAD_REQUEST,
            CheckinResult::InvalidToken => StatusCode::NOT_FOUND,
            CheckinResult::Revoked | CheckinResult::NotApproved | CheckinResult::NotPaid => StatusCode::FORBIDDEN,
            CheckinResult::Unauthorized => StatusCode::UNAUTHORIZED,
            CheckinResult::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl From<CheckinReport> for CheckinResponse {
    fn from(report: CheckinReport) -> Self {
        Self {
            result: report.result,
            message: report.message,
            guest_name: report.guest_name,
            counters: report.counters,
            missing_token: report.missing_token,
        }
    }
}

impl IntoResponse for CheckinResponse {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Staff scanner role request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerRoleRequest {
    /// Email of the staff member.
    pub scanner_email: String,
}

/// Guest moderation request.
#[derive(Debug, Clone, Deserialize)]
pub struct GuestActionRequest {
    /// One of `APPROVE`, `REJECT`, `REVOKE`, `MARK_PAID`, `MARK_CANT_MAKE`.
    pub action: String,
}

fn caller<S: AccessStore>(state: &AppState<S>, identity: HostIdentity, headers: &HeaderMap) -> Caller {
    Caller {
        host_user: identity.0,
        scanner_session: state
            .access
            .scanner
            .current_session(read_cookie(headers, cookies::SCANNER_SESSION)),
    }
}

/// Rate-limit identity for a caller: who they claim to be, before the
/// resolver decides whether that is enough.
fn actor_key(caller: &Caller) -> String {
    if let Some(user) = &caller.host_user {
        return format!("host:{}", user.id);
    }
    match &caller.scanner_session {
        Some(session) => format!(
            "scanner:{}:{}:{}",
            session.event_id,
            session.scanner_name.as_deref().unwrap_or_default(),
            session.granted_at.timestamp_millis()
        ),
        None => "anon".to_string(),
    }
}

/// Check a guest in at the door.
///
/// # Endpoint
///
/// ```text
/// POST /api/host/events/:event_id/checkin
/// Content-Type: application/json
///
/// { "token": "9f2c…" }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "result": "CHECKED_IN",
///   "message": "Checked in: Ada",
///   "guestName": "Ada",
///   "checkedIn": 12,
///   "approved": 40,
///   "remainingCapacity": 88
/// }
/// ```
///
/// Re-scanning a guest returns 200 with `ALREADY_CHECKED_IN`.
///
/// Scans are throttled per event, per caller identity and per client IP,
/// so door staff behind one NAT do not share a budget with each other or
/// with anonymous traffic.
pub async fn checkin<S: AccessStore>(
    State(state): State<AppState<S>>,
    Path(event_id): Path<EventId>,
    client_ip: ClientIp,
    identity: HostIdentity,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let caller = caller(&state, identity, &headers);
    let key = format!("checkin:{event_id}:{}:{}", actor_key(&caller), client_ip.0);
    let decision = state.access.rate_limiter.check(&key, limits::CHECKIN);
    let rate_headers = rate_limit_headers(&decision);
    if !decision.allowed {
        let body = CheckinResponse::bare(CheckinResult::RateLimited, "Too many scans. Try again in a moment.");
        return (rate_headers, body).into_response();
    }

    match check_in_with(&state, &event_id, &caller, &body).await {
        Ok(response) => (rate_headers, response).into_response(),
        Err(error) => error.with_headers(rate_headers).into_response(),
    }
}

async fn check_in_with<S: AccessStore>(
    state: &AppState<S>,
    event_id: &EventId,
    caller: &Caller,
    body: &[u8],
) -> Result<CheckinResponse, AppError> {
    let request: CheckinRequest = if body.is_empty() {
        CheckinRequest::default()
    } else {
        parse_json(body)?
    };
    let Some(access) = state.access.resolver().resolve(event_id, caller).await? else {
        return Ok(CheckinResponse::bare(
            CheckinResult::Unauthorized,
            "Not allowed for this event.",
        ));
    };

    let report = state.access.checkins().check_in(&access, &request.token).await?;
    tracing::info!(
        event_id = %event_id,
        actor = %access.actor_label(),
        result = report.result.as_str(),
        "Check-in attempt"
    );
    Ok(CheckinResponse::from(report))
}

/// Door totals for an event.
///
/// ```text
/// GET /api/host/events/:event_id/checkin-stats
/// ```
///
/// Responds `{ "checkedIn", "approved", "remainingCapacity" }`.
pub async fn checkin_stats<S: AccessStore>(
    State(state): State<AppState<S>>,
    Path(event_id): Path<EventId>,
    identity: HostIdentity,
    headers: HeaderMap,
) -> WebResult<Json<CheckinCounters>> {
    let caller = caller(&state, identity, &headers);
    let access = state.access.resolver().require(&event_id, &caller).await?;
    let counters = state.access.checkins().stats(&access).await?;
    Ok(Json(counters))
}

/// Approve, reject, revoke, or mark a guest request. Owner only.
///
/// ```text
/// POST /api/host/events/:event_id/guests/:guest_request_id
/// Content-Type: application/json
///
/// { "action": "APPROVE" }
/// ```
pub async fn guest_action<S: AccessStore>(
    State(state): State<AppState<S>>,
    Path((event_id, guest_request_id)): Path<(EventId, GuestRequestId)>,
    identity: HostIdentity,
    body: Bytes,
) -> WebResult<Json<serde_json::Value>> {
    let request: GuestActionRequest = parse_json(&body)?;
    let action: GuestAction = request.action.parse()?;
    let access = state.access.resolver().require(&event_id, &owner_caller(identity)).await?;
    state.access.guests().apply(&access, &guest_request_id, action).await?;

    tracing::info!(
        event_id = %event_id,
        guest_request_id = %guest_request_id,
        action = %request.action,
        "Guest request updated"
    );
    Ok(Json(serde_json::json!({ "ok": true })))
}

fn owner_caller(identity: HostIdentity) -> Caller {
    Caller {
        host_user: identity.0,
        scanner_session: None,
    }
}

/// Let a staff member's email scan at the door. Owner only.
///
/// ```text
/// POST /api/host/events/:event_id/scanners
/// Content-Type: application/json
///
/// { "scannerEmail": "door@example.com" }
/// ```
///
/// Responds `{ "ok": true, "scannerEmail": "door@example.com", "status": "ACTIVE" }`.
pub async fn grant_scanner<S: AccessStore>(
    State(state): State<AppState<S>>,
    Path(event_id): Path<EventId>,
    identity: HostIdentity,
    body: Bytes,
) -> WebResult<Json<serde_json::Value>> {
    let request: ScannerRoleRequest = parse_json(&body)?;
    let access = state.access.resolver().require(&event_id, &owner_caller(identity)).await?;
    let role = state.access.scanner_roles().grant(&access, &request.scanner_email).await?;

    Ok(Json(serde_json::json!({
        "ok": true,
        "scannerEmail": role.scanner_email,
        "status": role.status,
    })))
}

/// Withdraw a staff member's scanner role. Owner only.
///
/// ```text
/// DELETE /api/host/events/:event_id/scanners
/// Content-Type: application/json
///
/// { "scannerEmail": "door@example.com" }
/// ```
///
/// Responds `{ "ok": true, "revoked": true }`; `revoked` is `false` when the
/// email held no role.
pub async fn revoke_scanner<S: AccessStore>(
    State(state): State<AppState<S>>,
    Path(event_id): Path<EventId>,
    identity: HostIdentity,
    body: Bytes,
) -> WebResult<Json<serde_json::Value>> {
    let request: ScannerRoleRequest = parse_json(&body)?;
    let access = state.access.resolver().require(&event_id, &owner_caller(identity)).await?;
    let revoked = state.access.scanner_roles().revoke(&access, &request.scanner_email).await?;

    Ok(Json(serde_json::json!({ "ok": true, "revoked": revoked })))
}
