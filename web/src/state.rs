//! Application state for Axum handlers.

use crate::cookies::CookiePolicy;
use guestgate_access::AccessEnvironment;
use guestgate_access::providers::AccessStore;

/// Application state shared across all HTTP handlers.
///
/// # Type Parameters
///
/// - `S`: Access store (`PostgresAccessStore` in production,
///   `MockAccessStore` in tests)
#[derive(Clone)]
pub struct AppState<S: AccessStore> {
    /// Access services and their shared rate limiter.
    pub access: AccessEnvironment<S>,
    /// Cookie attributes.
    pub cookies: CookiePolicy,
}

impl<S: AccessStore> AppState<S> {
    /// Build state from an access environment, taking the cookie policy
    /// from its configuration.
    #[must_use]
    pub fn new(access: AccessEnvironment<S>) -> Self {
        let cookies = CookiePolicy::new(access.config.secure_cookies);
        Self { access, cookies }
    }
}
