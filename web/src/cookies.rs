//! Cookie reading and `Set-Cookie` formatting.
//!
//! All credential cookies are `HttpOnly; SameSite=Lax; Path=/`, plus
//! `Secure` in production. Envelope values are base64url with a `.`
//! separator, so they never need quoting.

use crate::error::AppError;
use http::{HeaderMap, HeaderValue, header};
use chrono::Duration;
use guestgate_access::membership::MembershipCookie;
use guestgate_access::scanner::{CookieUpdate, ScannerCookies};
use guestgate_access::constants::{cookies, ttl};

/// Attributes applied to every cookie the server sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    /// Add the `Secure` attribute.
    pub secure: bool,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self { secure: true }
    }
}

impl CookiePolicy {
    /// Create a policy.
    #[must_use]
    pub const fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// `Set-Cookie` value storing `value` under `name` for `max_age`.
    ///
    /// # Errors
    ///
    /// Returns an internal error if `value` is not a valid header value.
    pub fn set(&self, name: &str, value: &str, max_age: Duration) -> Result<HeaderValue, AppError> {
        self.render(name, value, max_age.num_seconds())
    }

    /// `Set-Cookie` value deleting `name`.
    ///
    /// # Errors
    ///
    /// Returns an internal error if `name` is not a valid header value.
    pub fn clear(&self, name: &str) -> Result<HeaderValue, AppError> {
        self.render(name, "", 0)
    }

    fn render(&self, name: &str, value: &str, max_age: i64) -> Result<HeaderValue, AppError> {
        let secure = if self.secure { "; Secure" } else { "" };
        let cookie = format!("{name}={value}; Max-Age={max_age}; Path=/; HttpOnly; SameSite=Lax{secure}");
        HeaderValue::from_str(&cookie)
            .map_err(|e| AppError::internal("Could not encode cookie").with_source(e.into()))
    }

    /// Append the membership cookie update to `headers`.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the cookie cannot be encoded.
    pub fn write_membership(&self, headers: &mut HeaderMap, update: &MembershipCookie) -> Result<(), AppError> {
        let value = match update {
            MembershipCookie::Set(envelope) => {
                self.set(cookies::GUEST_MEMBERSHIPS, envelope, ttl::GUEST_MEMBERSHIPS)?
            }
            MembershipCookie::Cleared => self.clear(cookies::GUEST_MEMBERSHIPS)?,
        };
        headers.append(header::SET_COOKIE, value);
        Ok(())
    }

    /// Append the scanner gate and session cookie updates to `headers`.
    ///
    /// # Errors
    ///
    /// Returns an internal error if a cookie cannot be encoded.
    pub fn write_scanner(&self, headers: &mut HeaderMap, update: &ScannerCookies) -> Result<(), AppError> {
        self.write_update(headers, cookies::SCANNER_GATE, &update.gate, ttl::SCANNER_GATE)?;
        self.write_update(headers, cookies::SCANNER_SESSION, &update.session, ttl::SCANNER_SESSION)
    }

    fn write_update(
        &self,
        headers: &mut HeaderMap,
        name: &str,
        update: &CookieUpdate,
        max_age: Duration,
    ) -> Result<(), AppError> {
        let value = match update {
            CookieUpdate::Keep => return Ok(()),
            CookieUpdate::Set(envelope) => self.set(name, envelope, max_age)?,
            CookieUpdate::Clear => self.clear(name)?,
        };
        headers.append(header::SET_COOKIE, value);
        Ok(())
    }
}

/// Find cookie `name` in the request's `Cookie` headers. Empty values
/// count as absent.
#[must_use]
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}
