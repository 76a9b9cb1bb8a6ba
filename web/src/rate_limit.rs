//! Rate-limit enforcement and response headers.
//!
//! Every throttled endpoint calls [`enforce`] before anything else and
//! attaches [`rate_limit_headers`] to its response, allowed or not.

use crate::error::AppError;
use http::{HeaderMap, HeaderName, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use guestgate_access::{RateLimitDecision, RateLimitPolicy, RateLimiter};

/// `X-RateLimit-Limit` header.
pub static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");

/// `X-RateLimit-Remaining` header.
pub static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Headers describing a rate-limit decision.
#[must_use]
pub fn rate_limit_headers(decision: &RateLimitDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(X_RATELIMIT_LIMIT.clone(), HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING.clone(), HeaderValue::from(decision.remaining));
    headers.insert(header::RETRY_AFTER, HeaderValue::from(decision.retry_after_seconds));
    headers
}

/// Consume one unit of `key`'s budget.
///
/// # Errors
///
/// Returns a 429 [`AppError`] carrying the headers when the budget is
/// spent.
pub fn enforce(
    limiter: &RateLimiter,
    key: &str,
    policy: RateLimitPolicy,
) -> Result<RateLimitDecision, AppError> {
    let decision = limiter.check(key, policy);
    if decision.allowed {
        Ok(decision)
    } else {
        Err(AppError::rate_limited(&decision))
    }
}

/// Render a handler result with the rate-limit headers attached.
pub fn respond(result: Result<Response, AppError>, decision: &RateLimitDecision) -> Response {
    let headers = rate_limit_headers(decision);
    match result {
        Ok(mut response) => {
            response.headers_mut().extend(headers);
            response
        }
        Err(error) => error.with_headers(headers).into_response(),
    }
}
