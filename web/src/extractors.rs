//! Custom Axum extractors.
//!
//! - `ClientIp`: client address, for rate-limit keys
//! - `HostIdentity`: the host user asserted by the upstream identity proxy
//!
//! # Examples
//!
//! ```ignore
//! use guestgate_web::extractors::{ClientIp, HostIdentity};
//!
//! async fn handler(client_ip: ClientIp, host: HostIdentity) -> String {
//!     format!("{} {:?}", client_ip.0, host.0.map(|user| user.id))
//! }
//! ```

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use guestgate_access::resolver::AuthenticatedUser;
use guestgate_core::HostUserId;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Header carrying the authenticated host user's ID.
pub const HOST_USER_ID_HEADER: &str = "X-Host-User-Id";

/// Header carrying the authenticated host user's email.
pub const HOST_USER_EMAIL_HEADER: &str = "X-Host-User-Email";

/// Client IP address.
///
/// # Priority
///
/// 1. `X-Forwarded-For` (first IP in the list)
/// 2. `X-Real-IP`
/// 3. Connection IP, when the server records it
/// 4. `127.0.0.1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = extract_client_ip(&parts.headers, parts.extensions.get());

        Ok(Self(ip))
    }
}

/// Extract client IP from headers or connection info.
fn extract_client_ip(headers: &HeaderMap, connect_info: Option<&ConnectInfo<SocketAddr>>) -> IpAddr {
    // Try X-Forwarded-For (take first IP)
    if let Some(forwarded) = headers.get("X-Forwarded-For") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(first_ip) = forwarded_str.split(',').next() {
                if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                    return ip;
                }
            }
        }
    }

    // Try X-Real-IP
    if let Some(real_ip) = headers.get("X-Real-IP") {
        if let Ok(ip_str) = real_ip.to_str() {
            if let Ok(ip) = ip_str.trim().parse::<IpAddr>() {
                return ip;
            }
        }
    }

    connect_info.map_or(IpAddr::V4(Ipv4Addr::LOCALHOST), |info| info.0.ip())
}

/// Host user asserted by the identity proxy, if any.
///
/// A missing or blank `X-Host-User-Id` means an anonymous request. The
/// email header is optional and only matters for staff scanner roles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostIdentity(pub Option<AuthenticatedUser>);

#[async_trait]
impl<S> FromRequestParts<S> for HostIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let user = header(HOST_USER_ID_HEADER).map(|id| AuthenticatedUser {
            id: HostUserId::from(id),
            email: header(HOST_USER_EMAIL_HEADER),
        });

        Ok(Self(user))
    }
}
