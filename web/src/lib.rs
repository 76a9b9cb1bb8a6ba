//! Axum HTTP surface for GuestGate.
//!
//! Thin shell over [`guestgate_access`]: handlers read cookies and
//! identity headers, apply rate limits, call the access services, and map
//! their results to JSON responses.
//!
//! # Request Flow
//!
//! 1. **Rate limit** the request by client IP (and caller, where known),
//!    before touching the body
//! 2. **Extract** cookies, identity headers, and the JSON body
//! 3. **Resolve** the caller's role at the event, when the endpoint is host-side
//! 4. **Call** the access service
//! 5. **Map** the result or [`AppError`] to a response, with rate-limit
//!    headers and any `Set-Cookie` updates
//!
//! # Example
//!
//! ```ignore
//! use guestgate_access::{AccessConfig, AccessEnvironment};
//! use guestgate_web::{router, AppState};
//!
//! let env = AccessEnvironment::new(store, AccessConfig::from_env()?);
//! let app = router(AppState::new(env));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod cookies;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod rate_limit;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use config::ServerConfig;
pub use cookies::CookiePolicy;
pub use error::AppError;
pub use extractors::{ClientIp, HostIdentity};
pub use router::router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
