//! Entry access tokens.
//!
//! A guest's QR code carries a raw token: 32 random bytes, hex-encoded.
//! The raw token is handed out once and never stored; the store keeps only
//! its SHA-256 ([`TokenHash`]). Verification hashes the presented token and
//! compares hashes.
//!
//! Each guest request has a single active hash. Issuing a new token for the
//! same guest overwrites the stored hash, so the previous raw token stops
//! resolving at once.

use crate::error::Result;
use crate::providers::{GuestAccessRecord, GuestAccessRepository};
use chrono::{DateTime, Utc};
use guestgate_core::{EventId, GuestRequestId};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Random bytes per raw token.
pub const TOKEN_BYTES: usize = 32;

/// Lowercase hex SHA-256 of `input`.
///
/// # Examples
///
/// ```
/// use guestgate_access::token::sha256_hex;
///
/// assert_eq!(
///     sha256_hex("abc"),
///     "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
/// );
/// ```
#[must_use]
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Stored form of an access token.
///
/// `Debug` prints only the first 8 characters so hashes can appear in logs
/// without making them searchable.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenHash(String);

impl TokenHash {
    /// Wrap an already-computed hash (as read back from storage).
    #[must_use]
    pub const fn from_stored(hash: String) -> Self {
        Self(hash)
    }

    /// The full hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 characters, for logging.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Debug for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenHash({}…)", self.prefix())
    }
}

/// A freshly issued token and its hash.
///
/// The raw token is redacted from `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Raw token for the guest's QR code.
    pub raw_token: String,
    /// Hash to persist.
    pub token_hash: TokenHash,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("raw_token", &"<redacted>")
            .field("token_hash", &self.token_hash)
            .finish()
    }
}

/// Issues and verifies access tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessTokenService;

impl AccessTokenService {
    /// Create the service.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Generate a new raw token and its hash.
    #[must_use]
    pub fn issue(&self) -> IssuedToken {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; TOKEN_BYTES];
        rng.fill_bytes(&mut bytes);

        let raw_token = hex::encode(bytes);
        let token_hash = self.hash(&raw_token);
        IssuedToken {
            raw_token,
            token_hash,
        }
    }

    /// Hash a raw token.
    #[must_use]
    pub fn hash(&self, raw_token: &str) -> TokenHash {
        TokenHash(sha256_hex(raw_token))
    }

    /// Whether `raw_token` hashes to `stored`, compared in constant time.
    #[must_use]
    pub fn verify(&self, raw_token: &str, stored: &TokenHash) -> bool {
        let presented = self.hash(raw_token);
        constant_time_eq::constant_time_eq(presented.as_str().as_bytes(), stored.as_str().as_bytes())
    }

    /// Issue a token for a guest and persist its hash, replacing any
    /// previous one. Returns the raw token and the stored grant.
    ///
    /// # Errors
    ///
    /// Returns error if the store write fails.
    pub async fn issue_for<R: GuestAccessRepository>(
        &self,
        repo: &R,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
        issued_at: DateTime<Utc>,
    ) -> Result<(IssuedToken, GuestAccessRecord)> {
        let issued = self.issue();
        let grant = repo
            .upsert_token_hash(event_id, guest_request_id, &issued.token_hash, issued_at)
            .await?;

        tracing::info!(
            event_id = %event_id,
            guest_request_id = %guest_request_id,
            access_id = %grant.id,
            hash_prefix = issued.token_hash.prefix(),
            "Access token issued"
        );
        Ok((issued, grant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_issue_shape() {
        let service = AccessTokenService::new();
        let issued = service.issue();

        assert_eq!(issued.raw_token.len(), TOKEN_BYTES * 2);
        assert!(issued.raw_token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(issued.token_hash.as_str().len(), 64);
        assert!(service.verify(&issued.raw_token, &issued.token_hash));
    }

    #[test]
    fn test_issue_is_random() {
        let service = AccessTokenService::new();
        assert_ne!(service.issue().raw_token, service.issue().raw_token);
    }

    #[test]
    fn test_reissue_invalidates_old_token() {
        let service = AccessTokenService::new();
        let old = service.issue();
        let current = service.issue();

        assert!(!service.verify(&old.raw_token, &current.token_hash));
    }

    #[test]
    fn test_debug_redacts() {
        let issued = AccessTokenService::new().issue();
        let debug = format!("{issued:?}");

        assert!(!debug.contains(&issued.raw_token));
        assert!(!debug.contains(issued.token_hash.as_str()));
        assert!(debug.contains(issued.token_hash.prefix()));
    }

    proptest! {
        #[test]
        fn prop_verify_own_hash(token in "[0-9a-f]{1,64}") {
            let service = AccessTokenService::new();
            prop_assert!(service.verify(&token, &service.hash(&token)));
        }

        #[test]
        fn prop_reject_other_hash(a in "[0-9a-f]{64}", b in "[0-9a-f]{64}") {
            prop_assume!(a != b);
            let service = AccessTokenService::new();
            prop_assert!(!service.verify(&a, &service.hash(&b)));
        }
    }
}
