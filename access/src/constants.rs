//! Access-control constants.
//!
//! Cookie names, credential lifetimes, and the per-endpoint rate-limit
//! policies shared by the access layer and the HTTP surface.

use crate::rate_limit::RateLimitPolicy;
use chrono::Duration;

/// Cookie names.
pub mod cookies {
    /// Guest membership envelope.
    pub const GUEST_MEMBERSHIPS: &str = "eventrl_guest";

    /// Scanner gate envelope (code verified, identity not yet claimed).
    pub const SCANNER_GATE: &str = "eventrl_scanner_gate";

    /// Scanner session envelope.
    pub const SCANNER_SESSION: &str = "eventrl_scanner";
}

/// Credential lifetimes.
pub mod ttl {
    use super::Duration;

    /// Guest membership cookie max-age.
    pub const GUEST_MEMBERSHIPS: Duration = Duration::days(30);

    /// Scanner gate lifetime.
    pub const SCANNER_GATE: Duration = Duration::minutes(10);

    /// Scanner session lifetime.
    pub const SCANNER_SESSION: Duration = Duration::days(14);
}

/// Rate-limit policies, one per throttled endpoint.
pub mod limits {
    use super::{Duration, RateLimitPolicy};

    /// Guest join: 12 requests per minute per event and IP.
    pub const GUEST_JOIN: RateLimitPolicy = RateLimitPolicy::new(12, Duration::minutes(1));

    /// Guest access recovery: 10 requests per minute per event and IP.
    pub const GUEST_RECOVER: RateLimitPolicy = RateLimitPolicy::new(10, Duration::minutes(1));

    /// Scanner access code: 15 attempts per minute per event and IP.
    pub const SCANNER_CODE: RateLimitPolicy = RateLimitPolicy::new(15, Duration::minutes(1));

    /// Check-in: 120 scans per minute per actor and IP.
    pub const CHECKIN: RateLimitPolicy = RateLimitPolicy::new(120, Duration::minutes(1));

    /// QR issuance: 30 requests per minute per guest and IP.
    pub const QR_ISSUE: RateLimitPolicy = RateLimitPolicy::new(30, Duration::minutes(1));
}

/// Validation bounds.
pub mod bounds {
    /// Scanner display name, after trimming, in characters.
    pub const SCANNER_NAME: std::ops::RangeInclusive<usize> = 2..=40;

    /// Guest display name, after trimming, in characters.
    pub const GUEST_NAME: std::ops::RangeInclusive<usize> = 2..=80;

    /// Scanner access code length (ASCII digits).
    pub const SCANNER_CODE_DIGITS: usize = 6;

    /// Recovery codes accepted on input (older codes were shorter).
    pub const RECOVERY_CODE_INPUT: std::ops::RangeInclusive<usize> = 4..=5;

    /// Attempts at generating a unique recovery code before giving up.
    pub const RECOVERY_CODE_ATTEMPTS: usize = 8;
}
