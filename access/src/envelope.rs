//! Signed envelopes.
//!
//! An envelope is a small JSON payload plus an HMAC-SHA256 signature,
//! carried as one opaque string:
//!
//! ```text
//! base64url(json) "." base64url(hmac_sha256(secret, base64url(json)))
//! ```
//!
//! Every cookie-shaped credential in this crate (guest memberships, scanner
//! gates, scanner sessions) is an envelope. Opening never fails loudly: any
//! structural, decoding, or signature problem yields an empty payload with
//! `tampered` set, and callers treat that exactly like a missing cookie.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_LEN: usize = 32;

/// Result of opening an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opened<T> {
    /// Decoded payload, present only when the signature verified.
    pub payload: Option<T>,
    /// Set when an envelope was presented but could not be trusted.
    pub tampered: bool,
}

impl<T> Opened<T> {
    const fn absent() -> Self {
        Self {
            payload: None,
            tampered: false,
        }
    }

    const fn tampered() -> Self {
        Self {
            payload: None,
            tampered: true,
        }
    }

    /// Consume into the payload, discarding the tamper flag.
    pub fn into_payload(self) -> Option<T> {
        self.payload
    }
}

/// Seals and opens signed envelopes with one secret.
///
/// A codec built without a secret is *disabled*: [`seal`](Self::seal)
/// returns `None` and every presented envelope opens as tampered.
///
/// # Example
///
/// ```
/// use guestgate_access::envelope::SignedEnvelopeCodec;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Claim { event: String }
///
/// let codec = SignedEnvelopeCodec::new("s3cret");
/// let sealed = codec.seal(&Claim { event: "evt1".into() }).unwrap();
///
/// let opened = codec.open::<Claim>(Some(&sealed));
/// assert_eq!(opened.payload, Some(Claim { event: "evt1".into() }));
/// assert!(!opened.tampered);
/// ```
#[derive(Clone)]
pub struct SignedEnvelopeCodec {
    secret: Option<Vec<u8>>,
}

impl fmt::Debug for SignedEnvelopeCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedEnvelopeCodec")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl SignedEnvelopeCodec {
    /// Create a codec. An empty secret yields a disabled codec.
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Self::disabled();
        }
        Self {
            secret: Some(secret.to_vec()),
        }
    }

    /// Create a codec with no secret.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { secret: None }
    }

    /// Returns `true` if a secret is configured.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Serialize and sign `payload`.
    ///
    /// Returns `None` when no secret is configured; callers must treat that
    /// as "credential issuance unavailable".
    pub fn seal<T: Serialize>(&self, payload: &T) -> Option<String> {
        let secret = self.secret.as_deref()?;
        let json = match serde_json::to_vec(payload) {
            Ok(json) => json,
            Err(error) => {
                tracing::error!(%error, "Failed to serialize envelope payload");
                return None;
            }
        };
        let body = URL_SAFE_NO_PAD.encode(json);
        let signature = URL_SAFE_NO_PAD.encode(sign(secret, body.as_bytes())?);
        Some(format!("{body}.{signature}"))
    }

    /// Verify and decode an envelope.
    ///
    /// `None` input opens as absent (not tampered). Anything else that does
    /// not verify opens as tampered.
    pub fn open<T: DeserializeOwned>(&self, envelope: Option<&str>) -> Opened<T> {
        let Some(envelope) = envelope else {
            return Opened::absent();
        };
        let Some(secret) = self.secret.as_deref() else {
            return Opened::tampered();
        };

        match verify(secret, envelope).and_then(|json| serde_json::from_slice(&json).ok()) {
            Some(payload) => Opened {
                payload: Some(payload),
                tampered: false,
            },
            None => {
                tracing::warn!(len = envelope.len(), "Rejected tampered envelope");
                Opened::tampered()
            }
        }
    }
}

fn sign(secret: &[u8], body: &[u8]) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(body);
    Some(mac.finalize().into_bytes().to_vec())
}

/// Returns the decoded JSON bytes if the envelope is well-formed and signed
/// with `secret`.
fn verify(secret: &[u8], envelope: &str) -> Option<Vec<u8>> {
    let mut parts = envelope.split('.');
    let body = parts.next().filter(|part| !part.is_empty())?;
    let signature = parts.next().filter(|part| !part.is_empty())?;
    if parts.next().is_some() {
        return None;
    }

    let presented = URL_SAFE_NO_PAD.decode(signature).ok()?;
    if presented.len() != SIGNATURE_LEN {
        return None;
    }
    let expected = sign(secret, body.as_bytes())?;
    if !constant_time_eq::constant_time_eq(&presented, &expected) {
        return None;
    }

    URL_SAFE_NO_PAD.decode(body).ok()
}
