//! HTTP router.
//!
//! Composes the guest, scanner, and host handlers into a single Axum
//! router.

use crate::handlers::{self, guest, host, scanner};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use guestgate_access::providers::AccessStore;
use tower_http::trace::TraceLayer;

/// Create the application router with all endpoints.
///
/// # Routes
///
/// - `GET /health` - Liveness check
/// - `POST /api/guest/join/:event_id` - Join an event
/// - `POST /api/guest/recover/:event_id` - Recover with a code
/// - `GET /api/guest/memberships` - List memberships
/// - `POST /api/guest/memberships/leave` - Forget one event
/// - `POST /api/guest/memberships/clear` - Forget every event
/// - `GET /api/guest/qr` - Issue a QR token
/// - `POST /api/guest/event-status` - Report arriving, running late, or can't make it
/// - `POST /api/scanner/access/:event_id` - Verify code or activate
/// - `POST /api/scanner/logout` - Drop scanner cookies
/// - `POST /api/host/events/:event_id/checkin` - Check a guest in
/// - `GET /api/host/events/:event_id/checkin-stats` - Door totals
/// - `POST /api/host/events/:event_id/guests/:guest_request_id` - Moderate a guest
/// - `POST /api/host/events/:event_id/scanners` - Grant a staff scanner role
/// - `DELETE /api/host/events/:event_id/scanners` - Revoke a staff scanner role
///
/// # Example
///
/// ```rust,ignore
/// let env = AccessEnvironment::new(store, AccessConfig::from_env()?);
/// let app = router(AppState::new(env));
/// axum::serve(listener, app).await?;
/// ```
pub fn router<S: AccessStore>(state: AppState<S>) -> Router {
    let guest_routes = Router::new()
        .route("/join/:event_id", post(guest::join::<S>))
        .route("/recover/:event_id", post(guest::recover::<S>))
        .route("/memberships", get(guest::list_memberships::<S>))
        .route("/memberships/leave", post(guest::leave_membership::<S>))
        .route("/memberships/clear", post(guest::clear_memberships::<S>))
        .route("/qr", get(guest::issue_qr::<S>))
        .route("/event-status", post(guest::event_status::<S>));

    let scanner_routes = Router::new()
        .route("/access/:event_id", post(scanner::access::<S>))
        .route("/logout", post(scanner::logout::<S>));

    let host_routes = Router::new()
        .route("/events/:event_id/checkin", post(host::checkin::<S>))
        .route("/events/:event_id/checkin-stats", get(host::checkin_stats::<S>))
        .route(
            "/events/:event_id/guests/:guest_request_id",
            post(host::guest_action::<S>),
        )
        .route(
            "/events/:event_id/scanners",
            post(host::grant_scanner::<S>).delete(host::revoke_scanner::<S>),
        );

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/guest", guest_routes)
        .nest("/api/scanner", scanner_routes)
        .nest("/api/host", host_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
