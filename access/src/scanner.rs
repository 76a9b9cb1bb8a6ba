//! Door-scanner credentials.
//!
//! A device earns scanning rights for one event in two steps:
//!
//! ```text
//!              correct 6-digit code              name (2-40 chars)
//! UNVERIFIED ───────────────────────▶ GATED ───────────────────────▶ ACTIVE
//!     ▲                          (gate, 10 min)                 (session, 14 days)
//!     └────────────── TTL elapsed or logout ◀───────────────────────────┘
//! ```
//!
//! Both steps are signed envelopes ([`ScannerGate`], [`ScannerSession`])
//! carried in separate cookies. Every check is scoped to one event: a gate
//! or session for event A says nothing about event B. Expiry is read from
//! the timestamp inside the signed payload, so replaying an old cookie does
//! not extend it.
//!
//! Whether the event owner's plan allows staff scanners is not decided
//! here; callers ask [`EventDirectory`](crate::providers::EventDirectory).

use crate::constants::{bounds, ttl};
use crate::envelope::SignedEnvelopeCodec;
use crate::token::sha256_hex;
use chrono::{DateTime, Duration, Utc};
use guestgate_core::EventId;
use guestgate_core::environment::Clock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Scanner credential failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ScannerError {
    /// Code is not exactly six digits.
    #[error("Access code must be 6 digits")]
    InvalidCodeFormat,

    /// Code does not match the event's code.
    #[error("Access code is incorrect")]
    InvalidCode,

    /// Event has no scanner access code.
    #[error("Scanner access code is not configured for this event")]
    CodeNotConfigured,

    /// No valid gate for this event; the code step must come first.
    #[error("Enter the event access code first")]
    GateRequired,

    /// Scanner name is out of bounds.
    #[error("Scanner name must be 2 to 40 characters")]
    InvalidScannerName,

    /// No signing secret is configured.
    #[error("Scanner signing is not configured")]
    SigningUnavailable,
}

/// Proof that the event code was presented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerGate {
    /// Event the code belongs to.
    pub event_id: EventId,
    /// When the code was verified.
    pub verified_at: DateTime<Utc>,
}

/// Named scanning rights for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerSession {
    /// Event the session is for.
    pub event_id: EventId,
    /// Name the scanner gave.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanner_name: Option<String>,
    /// When the session was granted.
    pub granted_at: DateTime<Utc>,
}

/// Where a device stands for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannerState {
    /// Neither a gate nor a session.
    Unverified,
    /// Code verified, name not yet given.
    Gated,
    /// Scanning allowed.
    Active {
        /// Name from the session, if it carries one.
        scanner_name: Option<String>,
    },
}

/// Change to apply to one cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieUpdate {
    /// Leave it alone.
    Keep,
    /// Write this envelope.
    Set(String),
    /// Expire it.
    Clear,
}

/// Cookie changes for the gate and session cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerCookies {
    /// Gate cookie.
    pub gate: CookieUpdate,
    /// Session cookie.
    pub session: CookieUpdate,
}

/// Result of a successful identity claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    /// The granted session.
    pub session: ScannerSession,
    /// Session set, gate cleared.
    pub cookies: ScannerCookies,
}

/// Issues and checks scanner gates and sessions.
#[derive(Clone)]
pub struct ScannerSessionManager {
    codec: SignedEnvelopeCodec,
    clock: Arc<dyn Clock>,
    gate_ttl: Duration,
    session_ttl: Duration,
}

impl std::fmt::Debug for ScannerSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScannerSessionManager")
            .field("codec", &self.codec)
            .field("gate_ttl", &self.gate_ttl)
            .field("session_ttl", &self.session_ttl)
            .finish_non_exhaustive()
    }
}

impl ScannerSessionManager {
    /// Create a manager with the default lifetimes (10 minutes, 14 days).
    #[must_use]
    pub fn new(codec: SignedEnvelopeCodec, clock: Arc<dyn Clock>) -> Self {
        Self {
            codec,
            clock,
            gate_ttl: ttl::SCANNER_GATE,
            session_ttl: ttl::SCANNER_SESSION,
        }
    }

    /// Override the gate lifetime.
    #[must_use]
    pub const fn with_gate_ttl(mut self, gate_ttl: Duration) -> Self {
        self.gate_ttl = gate_ttl;
        self
    }

    /// Override the session lifetime.
    #[must_use]
    pub const fn with_session_ttl(mut self, session_ttl: Duration) -> Self {
        self.session_ttl = session_ttl;
        self
    }

    /// The gate in `gate_cookie`, if it is valid, unexpired, and for `event_id`.
    #[must_use]
    pub fn open_gate(&self, gate_cookie: Option<&str>, event_id: &EventId) -> Option<ScannerGate> {
        let gate = self.codec.open::<ScannerGate>(gate_cookie).into_payload()?;
        (&gate.event_id == event_id && self.is_fresh(gate.verified_at, self.gate_ttl)).then_some(gate)
    }

    /// The session in `session_cookie`, if it is valid, unexpired, and for `event_id`.
    #[must_use]
    pub fn open_session(&self, session_cookie: Option<&str>, event_id: &EventId) -> Option<ScannerSession> {
        self.current_session(session_cookie)
            .filter(|session| &session.event_id == event_id)
    }

    /// The session in `session_cookie`, for whichever event, if it is valid
    /// and unexpired.
    #[must_use]
    pub fn current_session(&self, session_cookie: Option<&str>) -> Option<ScannerSession> {
        let session = self.codec.open::<ScannerSession>(session_cookie).into_payload()?;
        (!session.event_id.is_empty() && self.is_fresh(session.granted_at, self.session_ttl))
            .then_some(session)
    }

    /// Where the device stands for `event_id`. A session wins over a gate.
    #[must_use]
    pub fn state(
        &self,
        gate_cookie: Option<&str>,
        session_cookie: Option<&str>,
        event_id: &EventId,
    ) -> ScannerState {
        if let Some(session) = self.open_session(session_cookie, event_id) {
            return ScannerState::Active {
                scanner_name: session.scanner_name,
            };
        }
        if self.open_gate(gate_cookie, event_id).is_some() {
            return ScannerState::Gated;
        }
        ScannerState::Unverified
    }

    /// Check a presented access code and issue a gate for `event_id`.
    ///
    /// Codes are compared as SHA-256 hashes in constant time.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `presented` is not six ASCII digits → [`ScannerError::InvalidCodeFormat`]
    /// - The event has no code → [`ScannerError::CodeNotConfigured`]
    /// - The code is wrong → [`ScannerError::InvalidCode`]
    /// - Sealing is unavailable → [`ScannerError::SigningUnavailable`]
    pub fn verify_code(
        &self,
        event_id: &EventId,
        presented: &str,
        expected: Option<&str>,
    ) -> Result<String, ScannerError> {
        let presented = presented.trim();
        if !is_access_code(presented) {
            return Err(ScannerError::InvalidCodeFormat);
        }
        let expected = expected
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .ok_or(ScannerError::CodeNotConfigured)?;

        let matches = constant_time_eq::constant_time_eq(
            sha256_hex(presented).as_bytes(),
            sha256_hex(expected).as_bytes(),
        );
        if !matches {
            tracing::warn!(event_id = %event_id, "Scanner access code rejected");
            return Err(ScannerError::InvalidCode);
        }

        let gate = ScannerGate {
            event_id: event_id.clone(),
            verified_at: self.clock.now(),
        };
        let sealed = self.codec.seal(&gate).ok_or(ScannerError::SigningUnavailable)?;
        tracing::info!(event_id = %event_id, "Scanner gate granted");
        Ok(sealed)
    }

    /// Exchange a gate for a named session.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - No valid, unexpired gate for `event_id` → [`ScannerError::GateRequired`]
    /// - The trimmed name is not 2-40 characters → [`ScannerError::InvalidScannerName`]
    /// - Sealing is unavailable → [`ScannerError::SigningUnavailable`]
    pub fn activate(
        &self,
        gate_cookie: Option<&str>,
        event_id: &EventId,
        scanner_name: &str,
    ) -> Result<Activation, ScannerError> {
        if self.open_gate(gate_cookie, event_id).is_none() {
            return Err(ScannerError::GateRequired);
        }
        let scanner_name = scanner_name.trim();
        if !bounds::SCANNER_NAME.contains(&scanner_name.chars().count()) {
            return Err(ScannerError::InvalidScannerName);
        }

        let session = ScannerSession {
            event_id: event_id.clone(),
            scanner_name: Some(scanner_name.to_string()),
            granted_at: self.clock.now(),
        };
        let sealed = self.codec.seal(&session).ok_or(ScannerError::SigningUnavailable)?;
        tracing::info!(event_id = %event_id, scanner_name, "Scanner session granted");

        Ok(Activation {
            session,
            cookies: ScannerCookies {
                gate: CookieUpdate::Clear,
                session: CookieUpdate::Set(sealed),
            },
        })
    }

    /// Drop both credentials.
    #[must_use]
    pub const fn revoke(&self) -> ScannerCookies {
        ScannerCookies {
            gate: CookieUpdate::Clear,
            session: CookieUpdate::Clear,
        }
    }

    fn is_fresh(&self, issued_at: DateTime<Utc>, ttl: Duration) -> bool {
        self.clock.now() < issued_at + ttl
    }
}

fn is_access_code(code: &str) -> bool {
    code.len() == bounds::SCANNER_CODE_DIGITS && code.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use guestgate_testing::ManualClock;

    const CODE: &str = "482915";

    fn manager() -> (ScannerSessionManager, ManualClock) {
        let clock = ManualClock::at_test_epoch();
        let manager =
            ScannerSessionManager::new(SignedEnvelopeCodec::new("scanner-secret"), Arc::new(clock.clone()));
        (manager, clock)
    }

    fn evt(id: &str) -> EventId {
        EventId::from(id)
    }

    fn session_cookie(activation: &Activation) -> &str {
        match &activation.cookies.session {
            CookieUpdate::Set(value) => value,
            other => panic!("expected a session cookie, got {other:?}"),
        }
    }

    #[test]
    fn test_code_gates_only_its_event() {
        let (manager, _) = manager();
        let gate = manager.verify_code(&evt("A"), CODE, Some(CODE)).unwrap();

        assert_eq!(manager.state(Some(&gate), None, &evt("A")), ScannerState::Gated);
        assert_eq!(manager.state(Some(&gate), None, &evt("B")), ScannerState::Unverified);
    }

    #[test]
    fn test_activate_from_gate() {
        let (manager, _) = manager();
        let gate = manager.verify_code(&evt("A"), CODE, Some(CODE)).unwrap();

        let activation = manager.activate(Some(&gate), &evt("A"), "  Door 1  ").unwrap();
        assert_eq!(activation.cookies.gate, CookieUpdate::Clear);
        assert_eq!(activation.session.scanner_name.as_deref(), Some("Door 1"));

        let session = session_cookie(&activation);
        assert_eq!(
            manager.state(None, Some(session), &evt("A")),
            ScannerState::Active {
                scanner_name: Some("Door 1".to_string())
            }
        );
        assert_eq!(manager.state(None, Some(session), &evt("B")), ScannerState::Unverified);
    }

    #[test]
    fn test_activate_requires_gate_for_same_event() {
        let (manager, _) = manager();
        assert_eq!(
            manager.activate(None, &evt("A"), "Door 1"),
            Err(ScannerError::GateRequired)
        );

        let gate_b = manager.verify_code(&evt("B"), CODE, Some(CODE)).unwrap();
        assert_eq!(
            manager.activate(Some(&gate_b), &evt("A"), "Door 1"),
            Err(ScannerError::GateRequired)
        );
    }

    #[test]
    fn test_gate_expires_after_ten_minutes() {
        let (manager, clock) = manager();
        let gate = manager.verify_code(&evt("A"), CODE, Some(CODE)).unwrap();

        clock.advance(Duration::minutes(9));
        assert_eq!(manager.state(Some(&gate), None, &evt("A")), ScannerState::Gated);

        clock.advance(Duration::minutes(1));
        assert_eq!(manager.state(Some(&gate), None, &evt("A")), ScannerState::Unverified);
        assert_eq!(
            manager.activate(Some(&gate), &evt("A"), "Door 1"),
            Err(ScannerError::GateRequired)
        );
    }

    #[test]
    fn test_session_expires_after_fourteen_days() {
        let (manager, clock) = manager();
        let gate = manager.verify_code(&evt("A"), CODE, Some(CODE)).unwrap();
        let activation = manager.activate(Some(&gate), &evt("A"), "Door 1").unwrap();
        let session = session_cookie(&activation).to_string();

        clock.advance(Duration::days(14) - Duration::seconds(1));
        assert!(manager.open_session(Some(&session), &evt("A")).is_some());

        clock.advance(Duration::seconds(1));
        assert!(manager.open_session(Some(&session), &evt("A")).is_none());
    }

    #[test]
    fn test_code_validation() {
        let (manager, _) = manager();
        for bad in ["", "12345", "1234567", "12a456", "١٢٣٤٥٦"] {
            assert_eq!(
                manager.verify_code(&evt("A"), bad, Some(CODE)),
                Err(ScannerError::InvalidCodeFormat),
                "{bad:?}"
            );
        }
        assert_eq!(
            manager.verify_code(&evt("A"), "000000", Some(CODE)),
            Err(ScannerError::InvalidCode)
        );
        assert_eq!(
            manager.verify_code(&evt("A"), CODE, None),
            Err(ScannerError::CodeNotConfigured)
        );
        assert!(manager.verify_code(&evt("A"), " 482915 ", Some(CODE)).is_ok());
    }

    #[test]
    fn test_scanner_name_bounds() {
        let (manager, _) = manager();
        let gate = manager.verify_code(&evt("A"), CODE, Some(CODE)).unwrap();

        assert_eq!(
            manager.activate(Some(&gate), &evt("A"), " x "),
            Err(ScannerError::InvalidScannerName)
        );
        assert_eq!(
            manager.activate(Some(&gate), &evt("A"), &"n".repeat(41)),
            Err(ScannerError::InvalidScannerName)
        );
        assert!(manager.activate(Some(&gate), &evt("A"), &"n".repeat(40)).is_ok());
    }

    #[test]
    fn test_forged_session_is_unverified() {
        let (manager, _) = manager();
        let other = ScannerSessionManager::new(
            SignedEnvelopeCodec::new("someone-else"),
            Arc::new(ManualClock::at_test_epoch()),
        );
        let gate = other.verify_code(&evt("A"), CODE, Some(CODE)).unwrap();
        let forged = other.activate(Some(&gate), &evt("A"), "Mallory").unwrap();

        assert_eq!(
            manager.state(Some(&gate), Some(session_cookie(&forged)), &evt("A")),
            ScannerState::Unverified
        );
    }

    #[test]
    fn test_signing_unavailable() {
        let manager = ScannerSessionManager::new(
            SignedEnvelopeCodec::disabled(),
            Arc::new(ManualClock::at_test_epoch()),
        );
        assert_eq!(
            manager.verify_code(&evt("A"), CODE, Some(CODE)),
            Err(ScannerError::SigningUnavailable)
        );
    }

    #[test]
    fn test_revoke_clears_both() {
        let (manager, _) = manager();
        let cookies = manager.revoke();
        assert_eq!(cookies.gate, CookieUpdate::Clear);
        assert_eq!(cookies.session, CookieUpdate::Clear);
    }
}
