//! Guest endpoints: join, recover, memberships, QR code, attendance plans.

use super::parse_json;
use crate::cookies::read_cookie;
use crate::error::AppError;
use crate::extractors::ClientIp;
use crate::rate_limit::{enforce, respond};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use guestgate_access::constants::{cookies, limits};
use guestgate_access::membership::MembershipCookie;
use guestgate_access::providers::{AccessStore, GuestRecord};
use guestgate_access::{AccessError, GuestMembership};
use guestgate_core::{EventId, GuestEventStatus, GuestRequestId, GuestStatus};
use serde::{Deserialize, Serialize};

/// Request to join an event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    /// Name to show the host.
    pub display_name: String,
}

/// Request to recover access on a new device.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverRequest {
    /// Recovery code shown after joining.
    pub code: String,
}

/// Request to forget one event's membership.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    /// Event to forget.
    pub event_id: EventId,
}

/// Guest's report of their plans for an event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStatusRequest {
    /// Event the report is for; must be in the membership cookie.
    pub event_id: EventId,
    /// `ARRIVING`, `RUNNING_LATE` or `CANT_MAKE`.
    pub status: GuestEventStatus,
}

/// Query for the QR endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QrQuery {
    /// Event to fetch the QR code for; most recent membership if absent.
    pub event: Option<EventId>,
}

/// Guest request as returned to the guest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestResponse {
    /// Event ID.
    pub event_id: EventId,
    /// Guest request ID.
    pub guest_request_id: GuestRequestId,
    /// Display name.
    pub display_name: String,
    /// Current status.
    pub status: GuestStatus,
    /// Plan the guest last reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_status: Option<GuestEventStatus>,
    /// Recovery code, returned only on join.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_code: Option<String>,
}

impl GuestResponse {
    fn from_record(guest: GuestRecord, include_code: bool) -> Self {
        Self {
            event_id: guest.event_id,
            guest_request_id: guest.id,
            display_name: guest.display_name,
            status: guest.status,
            event_status: guest.event_status,
            recovery_code: if include_code { guest.recovery_code } else { None },
        }
    }
}

/// Memberships held by this browser.
#[derive(Debug, Clone, Serialize)]
pub struct MembershipsResponse {
    /// One entry per event.
    pub memberships: Vec<GuestMembership>,
}

/// Freshly issued QR token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrResponse {
    /// Raw token to encode in the QR code.
    pub token: String,
    /// Event ID.
    pub event_id: EventId,
    /// Event name.
    pub event_name: String,
    /// Guest display name.
    pub display_name: String,
}

/// Join an event as a guest.
///
/// # Endpoint
///
/// ```text
/// POST /api/guest/join/:event_id
/// Content-Type: application/json
///
/// { "displayName": "Ada Lovelace" }
/// ```
///
/// Responds 201 with the guest request (including its recovery code) and
/// adds the event to the membership cookie.
pub async fn join<S: AccessStore>(
    State(state): State<AppState<S>>,
    Path(event_id): Path<EventId>,
    client_ip: ClientIp,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let key = format!("guest:join:{event_id}:{}", client_ip.0);
    let decision = match enforce(&state.access.rate_limiter, &key, limits::GUEST_JOIN) {
        Ok(decision) => decision,
        Err(error) => return error.into_response(),
    };

    let result = async {
        let request: JoinRequest = parse_json(&body)?;
        let guest = state.access.guests().join(&event_id, &request.display_name).await?;
        let mut response_headers = HeaderMap::new();
        attach_membership(&state, &headers, &mut response_headers, &guest)?;

        Ok::<_, AppError>((
            StatusCode::CREATED,
            response_headers,
            Json(GuestResponse::from_record(guest, true)),
        )
            .into_response())
    }
    .await;

    respond(result, &decision)
}

/// Recover a guest request with its recovery code.
///
/// # Endpoint
///
/// ```text
/// POST /api/guest/recover/:event_id
/// Content-Type: application/json
///
/// { "code": "48213" }
/// ```
pub async fn recover<S: AccessStore>(
    State(state): State<AppState<S>>,
    Path(event_id): Path<EventId>,
    client_ip: ClientIp,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let key = format!("guest:recover:{event_id}:{}", client_ip.0);
    let decision = match enforce(&state.access.rate_limiter, &key, limits::GUEST_RECOVER) {
        Ok(decision) => decision,
        Err(error) => return error.into_response(),
    };

    let result = async {
        let request: RecoverRequest = parse_json(&body)?;
        let guest = state.access.guests().recover(&event_id, &request.code).await?;
        let mut response_headers = HeaderMap::new();
        attach_membership(&state, &headers, &mut response_headers, &guest)?;

        Ok::<_, AppError>((response_headers, Json(GuestResponse::from_record(guest, false))).into_response())
    }
    .await;

    respond(result, &decision)
}

fn attach_membership<S: AccessStore>(
    state: &AppState<S>,
    request_headers: &HeaderMap,
    response_headers: &mut HeaderMap,
    guest: &GuestRecord,
) -> Result<(), AppError> {
    let existing = read_cookie(request_headers, cookies::GUEST_MEMBERSHIPS);
    let envelope = state
        .access
        .memberships
        .add_or_replace(existing, &guest.event_id, &guest.id)
        .ok_or(AccessError::SigningUnavailable)?;
    state
        .cookies
        .write_membership(response_headers, &MembershipCookie::Set(envelope))
}

/// List this browser's memberships.
///
/// ```text
/// GET /api/guest/memberships
/// ```
#[allow(clippy::unused_async)]
pub async fn list_memberships<S: AccessStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Json<MembershipsResponse> {
    let existing = read_cookie(&headers, cookies::GUEST_MEMBERSHIPS);
    Json(MembershipsResponse {
        memberships: state.access.memberships.list_all(existing),
    })
}

/// Forget one event.
///
/// ```text
/// POST /api/guest/memberships/leave
/// Content-Type: application/json
///
/// { "eventId": "evt1" }
/// ```
pub async fn leave_membership<S: AccessStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Json(request): Json<LeaveRequest>,
) -> Result<Response, AppError> {
    let existing = read_cookie(&headers, cookies::GUEST_MEMBERSHIPS);
    let update = state.access.memberships.remove(existing, &request.event_id);
    let remaining = match &update {
        MembershipCookie::Set(envelope) => state.access.memberships.list_all(Some(envelope)),
        MembershipCookie::Cleared => Vec::new(),
    };

    let mut response_headers = HeaderMap::new();
    state.cookies.write_membership(&mut response_headers, &update)?;
    Ok((response_headers, Json(MembershipsResponse { memberships: remaining })).into_response())
}

/// Forget every event.
///
/// ```text
/// POST /api/guest/memberships/clear
/// ```
#[allow(clippy::unused_async)]
pub async fn clear_memberships<S: AccessStore>(State(state): State<AppState<S>>) -> Result<Response, AppError> {
    let mut response_headers = HeaderMap::new();
    state
        .cookies
        .write_membership(&mut response_headers, &state.access.memberships.clear())?;
    Ok((
        response_headers,
        Json(MembershipsResponse { memberships: Vec::new() }),
    )
        .into_response())
}

/// Issue a fresh QR token, replacing the previous one.
///
/// # Endpoint
///
/// ```text
/// GET /api/guest/qr?event=evt1
/// ```
///
/// # Response
///
/// ```json
/// { "token": "…", "eventId": "evt1", "eventName": "Launch", "displayName": "Ada" }
/// ```
pub async fn issue_qr<S: AccessStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<QrQuery>,
    client_ip: ClientIp,
    headers: HeaderMap,
) -> Response {
    let existing = read_cookie(&headers, cookies::GUEST_MEMBERSHIPS);
    let membership = state.access.memberships.select(existing, query.event.as_ref());
    let holder = membership
        .as_ref()
        .map_or("anon", |membership| membership.guest_request_id.as_str());
    let key = format!("guest:qr:{holder}:{}", client_ip.0);
    let decision = match enforce(&state.access.rate_limiter, &key, limits::QR_ISSUE) {
        Ok(decision) => decision,
        Err(error) => return error.into_response(),
    };

    let result = async {
        let membership = membership.ok_or_else(|| AppError::unauthorized("No guest session."))?;
        let grant = state.access.guests().issue_qr(&membership).await?;

        Ok::<_, AppError>(Json(QrResponse {
            token: grant.token.raw_token,
            event_id: grant.event.id,
            event_name: grant.event.name,
            display_name: grant.guest.display_name,
        })
        .into_response())
    }
    .await;

    respond(result, &decision)
}

/// Report whether the guest is still coming.
///
/// # Endpoint
///
/// ```text
/// POST /api/guest/event-status
/// Content-Type: application/json
///
/// { "eventId": "evt1", "status": "RUNNING_LATE" }
/// ```
///
/// The guest is identified by the membership cookie. `CANT_MAKE` revokes
/// their QR code; any later report restores it.
pub async fn event_status<S: AccessStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<GuestResponse>, AppError> {
    let request: EventStatusRequest = parse_json(&body)?;
    let existing = read_cookie(&headers, cookies::GUEST_MEMBERSHIPS);
    let membership = state
        .access
        .memberships
        .select(existing, Some(&request.event_id))
        .ok_or_else(|| AppError::unauthorized("No guest session."))?;

    let guest = state
        .access
        .guests()
        .set_event_status(&membership, request.status)
        .await?;
    Ok(Json(GuestResponse::from_record(guest, false)))
}
