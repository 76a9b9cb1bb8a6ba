//! Error types for web handlers.
//!
//! This module bridges access-layer errors and HTTP responses,
//! implementing Axum's `IntoResponse` trait.

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use guestgate_access::{AccessError, RateLimitDecision, ScannerError};
use serde::Serialize;
use std::fmt;

use crate::rate_limit::rate_limit_headers;

/// Application error type for web handlers.
///
/// Wraps domain errors and renders them as `{ "code", "message" }` JSON.
/// Server errors are logged with their source; the source is never sent
/// to the client.
///
/// # Examples
///
/// ```
/// use guestgate_web::AppError;
/// use axum::http::StatusCode;
///
/// let err = AppError::bad_request("display name must be 2 to 80 characters");
/// assert_eq!(err.status(), StatusCode::BAD_REQUEST);
/// assert_eq!(err.code(), "BAD_REQUEST");
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Extra response headers
    headers: HeaderMap,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: code.into(),
            headers: HeaderMap::new(),
            source: None,
        }
    }

    /// Attach a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Attach extra response headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message, "UNAUTHORIZED")
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message, code)
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{resource} not found"), "NOT_FOUND")
    }

    /// Create a 429 Too Many Requests error carrying the rate-limit headers.
    #[must_use]
    pub fn rate_limited(decision: &RateLimitDecision) -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many attempts. Try again in a moment.",
            "RATE_LIMITED",
        )
        .with_headers(rate_limit_headers(decision))
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, "INTERNAL_SERVER_ERROR")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, self.headers, Json(body)).into_response()
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthorized => Self::unauthorized("Not authorized for this event."),
            AccessError::EntitlementRequired => Self::forbidden(
                "Scanner access requires an upgraded host plan.",
                "ENTITLEMENT_REQUIRED",
            ),
            AccessError::EventNotFound => Self::not_found("Event"),
            AccessError::GuestNotFound => Self::not_found("Guest request"),
            AccessError::NotApproved => Self::forbidden("Guest not approved.", "NOT_APPROVED"),
            AccessError::NotPaid => {
                Self::forbidden("Payment not confirmed by host yet.", "NOT_PAID")
            }
            AccessError::InvalidInput { reason } => Self::bad_request(reason),
            other @ AccessError::SigningUnavailable => {
                Self::internal("Credential signing is not configured.")
                    .with_source(anyhow::Error::new(other))
            }
            other @ (AccessError::Store(_) | AccessError::Internal(_)) => {
                Self::internal("An internal error occurred").with_source(anyhow::Error::new(other))
            }
        }
    }
}

impl From<ScannerError> for AppError {
    fn from(err: ScannerError) -> Self {
        let message = err.to_string();
        match err {
            ScannerError::InvalidCodeFormat => Self::new(StatusCode::BAD_REQUEST, message, "SCANNER_INVALID_CODE"),
            ScannerError::InvalidCode => Self::new(StatusCode::FORBIDDEN, message, "SCANNER_INVALID_CODE"),
            ScannerError::CodeNotConfigured => {
                Self::new(StatusCode::CONFLICT, message, "SCANNER_CODE_NOT_CONFIGURED")
            }
            ScannerError::GateRequired => Self::new(StatusCode::UNAUTHORIZED, message, "SCANNER_GATE_REQUIRED"),
            ScannerError::InvalidScannerName => {
                Self::new(StatusCode::BAD_REQUEST, message, "INVALID_SCANNER_NAME")
            }
            ScannerError::SigningUnavailable => Self::internal(message).with_source(anyhow::Error::new(err)),
        }
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}
