//! Access-layer configuration.
//!
//! Loads configuration from environment variables, or builds it directly
//! for tests and embedding.

use crate::envelope::SignedEnvelopeCodec;
use crate::error::{AccessError, Result};
use std::env;
use std::fmt;

/// Environment variable holding the guest membership signing secret.
pub const GUEST_SECRET_VAR: &str = "GUESTGATE_GUEST_COOKIE_SECRET";

/// Environment variable holding the scanner signing secret.
pub const SCANNER_SECRET_VAR: &str = "GUESTGATE_SCANNER_COOKIE_SECRET";

/// Environment variable toggling the `Secure` cookie attribute.
pub const SECURE_COOKIES_VAR: &str = "GUESTGATE_SECURE_COOKIES";

/// A signing secret. Never printed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Whether the secret is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The secret bytes.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("Secret(<unset>)")
        } else {
            f.write_str("Secret(<redacted>)")
        }
    }
}

/// Signing secrets and cookie policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConfig {
    /// Secret for guest membership envelopes.
    pub guest_secret: Secret,
    /// Secret for scanner gate and session envelopes. Falls back to the
    /// guest secret when unset.
    pub scanner_secret: Secret,
    /// Whether cookies carry the `Secure` attribute.
    pub secure_cookies: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            guest_secret: Secret::default(),
            scanner_secret: Secret::default(),
            secure_cookies: true,
        }
    }
}

impl AccessConfig {
    /// Configuration with no secrets and secure cookies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the guest membership secret.
    #[must_use]
    pub fn with_guest_secret(mut self, secret: impl Into<String>) -> Self {
        self.guest_secret = Secret::new(secret);
        self
    }

    /// Set the scanner secret.
    #[must_use]
    pub fn with_scanner_secret(mut self, secret: impl Into<String>) -> Self {
        self.scanner_secret = Secret::new(secret);
        self
    }

    /// Toggle the `Secure` cookie attribute.
    #[must_use]
    pub const fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `GUESTGATE_GUEST_COOKIE_SECRET` | required |
    /// | `GUESTGATE_SCANNER_COOKIE_SECRET` | guest secret |
    /// | `GUESTGATE_SECURE_COOKIES` | `true` |
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::SigningUnavailable`] if the guest secret is
    /// missing or empty.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let guest_secret = lookup(GUEST_SECRET_VAR)
            .map(Secret::new)
            .filter(|secret| !secret.is_empty())
            .ok_or(AccessError::SigningUnavailable)?;
        let scanner_secret = lookup(SCANNER_SECRET_VAR)
            .map(Secret::new)
            .filter(|secret| !secret.is_empty())
            .unwrap_or_else(|| guest_secret.clone());
        let secure_cookies = lookup(SECURE_COOKIES_VAR)
            .and_then(|value| parse_bool(&value))
            .unwrap_or(true);

        Ok(Self {
            guest_secret,
            scanner_secret,
            secure_cookies,
        })
    }

    /// Codec for guest membership envelopes.
    #[must_use]
    pub fn guest_codec(&self) -> SignedEnvelopeCodec {
        SignedEnvelopeCodec::new(self.guest_secret.expose())
    }

    /// Codec for scanner envelopes, using the guest secret when no scanner
    /// secret is set.
    #[must_use]
    pub fn scanner_codec(&self) -> SignedEnvelopeCodec {
        if self.scanner_secret.is_empty() {
            self.guest_codec()
        } else {
            SignedEnvelopeCodec::new(self.scanner_secret.expose())
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
