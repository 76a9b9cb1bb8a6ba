//! Scanner device endpoints: access code, name, logout.
//!
//! A device becomes a scanner in two steps. `verify` exchanges the
//! event's six-digit access code for a short-lived gate cookie;
//! `activate` exchanges the gate and a name for a 14-day session cookie.
//! Both steps require the owner's scanner entitlement.

use super::parse_json;
use crate::cookies::read_cookie;
use crate::error::AppError;
use crate::extractors::ClientIp;
use crate::rate_limit::{enforce, respond};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use guestgate_access::constants::{cookies, limits};
use guestgate_access::providers::{AccessStore, EventDirectory, EventRecord};
use guestgate_access::scanner::{CookieUpdate, ScannerCookies};
use guestgate_access::{AccessError, ScannerError};
use guestgate_core::EventId;
use serde::{Deserialize, Serialize};

/// Step requested by the scanner device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerAction {
    /// Present the access code.
    Verify,
    /// Present a name after verifying.
    Activate,
}

/// Scanner access request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerAccessRequest {
    /// Step to perform.
    pub action: ScannerAction,
    /// Six-digit code, for `verify`.
    #[serde(default)]
    pub access_code: Option<String>,
    /// Name shown in check-in records, for `activate`.
    #[serde(default)]
    pub scanner_name: Option<String>,
}

/// Where the device stands after the request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerAccessResponse {
    /// `identity` after verify, `active` after activate.
    pub stage: &'static str,
    /// Name bound to the session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanner_name: Option<String>,
}

/// Verify an access code or activate a scanner session.
///
/// # Endpoint
///
/// ```text
/// POST /api/scanner/access/:event_id
/// Content-Type: application/json
///
/// { "action": "verify", "accessCode": "123456" }
/// { "action": "activate", "scannerName": "North door" }
/// ```
pub async fn access<S: AccessStore>(
    State(state): State<AppState<S>>,
    Path(event_id): Path<EventId>,
    client_ip: ClientIp,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request: ScannerAccessRequest = match parse_json(&body) {
        Ok(request) => request,
        Err(error) => return error.into_response(),
    };

    match request.action {
        ScannerAction::Verify => {
            let key = format!("scanner:access:{event_id}:{}", client_ip.0);
            let decision = match enforce(&state.access.rate_limiter, &key, limits::SCANNER_CODE) {
                Ok(decision) => decision,
                Err(error) => return error.into_response(),
            };
            let code = request.access_code.unwrap_or_default();
            respond(verify(&state, &event_id, &code).await, &decision)
        }
        ScannerAction::Activate => {
            let name = request.scanner_name.unwrap_or_default();
            activate(&state, &event_id, &headers, &name)
                .await
                .unwrap_or_else(IntoResponse::into_response)
        }
    }
}

async fn verify<S: AccessStore>(state: &AppState<S>, event_id: &EventId, code: &str) -> Result<Response, AppError> {
    let event = entitled_event(state, event_id).await?;
    let gate = state
        .access
        .scanner
        .verify_code(event_id, code, event.scanner_access_code.as_deref())?;

    let mut response_headers = HeaderMap::new();
    state.cookies.write_scanner(
        &mut response_headers,
        &ScannerCookies {
            gate: CookieUpdate::Set(gate),
            session: CookieUpdate::Keep,
        },
    )?;
    Ok((
        response_headers,
        Json(ScannerAccessResponse {
            stage: "identity",
            scanner_name: None,
        }),
    )
        .into_response())
}

async fn activate<S: AccessStore>(
    state: &AppState<S>,
    event_id: &EventId,
    headers: &HeaderMap,
    name: &str,
) -> Result<Response, AppError> {
    let gate_cookie = read_cookie(headers, cookies::SCANNER_GATE);
    if state.access.scanner.open_gate(gate_cookie, event_id).is_none() {
        return Err(ScannerError::GateRequired.into());
    }
    entitled_event(state, event_id).await?;

    let activation = state.access.scanner.activate(gate_cookie, event_id, name)?;
    let mut response_headers = HeaderMap::new();
    state.cookies.write_scanner(&mut response_headers, &activation.cookies)?;
    Ok((
        response_headers,
        Json(ScannerAccessResponse {
            stage: "active",
            scanner_name: activation.session.scanner_name,
        }),
    )
        .into_response())
}

async fn entitled_event<S: AccessStore>(state: &AppState<S>, event_id: &EventId) -> Result<EventRecord, AppError> {
    let store = &state.access.store;
    let event = store
        .find_event(event_id)
        .await?
        .ok_or(AccessError::EventNotFound)?;
    if !store.owner_has_scanner_entitlement(&event.host_user_id).await? {
        return Err(AccessError::EntitlementRequired.into());
    }
    Ok(event)
}

/// Drop the scanner gate and session cookies.
///
/// ```text
/// POST /api/scanner/logout
/// ```
#[allow(clippy::unused_async)]
pub async fn logout<S: AccessStore>(State(state): State<AppState<S>>) -> Result<Response, AppError> {
    let mut response_headers = HeaderMap::new();
    state
        .cookies
        .write_scanner(&mut response_headers, &state.access.scanner.revoke())?;
    Ok((response_headers, Json(serde_json::json!({ "ok": true }))).into_response())
}
