//! Access environment.
//!
//! Bundles the store, clock, shared rate limiter, envelope codecs and
//! configuration, and hands out the services built on them.

use crate::checkin::CheckInService;
use crate::config::AccessConfig;
use crate::guests::GuestAccessService;
use crate::membership::GuestMembershipStore;
use crate::providers::AccessStore;
use crate::rate_limit::RateLimiter;
use crate::resolver::EventAccessResolver;
use crate::scanner::ScannerSessionManager;
use crate::scanner_roles::ScannerRoleService;
use guestgate_core::environment::{Clock, SystemClock};
use std::sync::Arc;

/// Access environment.
///
/// Contains everything the access services need. Cloning is cheap and
/// clones share the rate-limit table.
///
/// # Type Parameters
///
/// - `S`: Store implementing every provider trait
#[derive(Clone)]
pub struct AccessEnvironment<S: AccessStore> {
    /// Store (`PostgreSQL` in production, in-memory in tests).
    pub store: S,

    /// Time source.
    pub clock: Arc<dyn Clock>,

    /// Process-wide rate limiter.
    pub rate_limiter: Arc<RateLimiter>,

    /// Guest membership cookie store.
    pub memberships: GuestMembershipStore,

    /// Scanner gate and session manager.
    pub scanner: ScannerSessionManager,

    /// Configuration the codecs were built from.
    pub config: AccessConfig,
}

impl<S: AccessStore> AccessEnvironment<S> {
    /// Create an environment on the system clock.
    #[must_use]
    pub fn new(store: S, config: AccessConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create an environment on a custom clock.
    #[must_use]
    pub fn with_clock(store: S, config: AccessConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            rate_limiter: Arc::new(RateLimiter::new(Arc::clone(&clock))),
            memberships: GuestMembershipStore::new(config.guest_codec(), Arc::clone(&clock)),
            scanner: ScannerSessionManager::new(config.scanner_codec(), Arc::clone(&clock)),
            store,
            clock,
            config,
        }
    }

    /// Resolver over this environment's store.
    #[must_use]
    pub fn resolver(&self) -> EventAccessResolver<S> {
        EventAccessResolver::new(self.store.clone())
    }

    /// Check-in service over this environment's store.
    #[must_use]
    pub fn checkins(&self) -> CheckInService<S> {
        CheckInService::new(self.store.clone(), Arc::clone(&self.clock))
    }

    /// Guest lifecycle service over this environment's store.
    #[must_use]
    pub fn guests(&self) -> GuestAccessService<S> {
        GuestAccessService::new(self.store.clone(), Arc::clone(&self.clock))
    }

    /// Staff scanner role service over this environment's store.
    #[must_use]
    pub fn scanner_roles(&self) -> ScannerRoleService<S> {
        ScannerRoleService::new(self.store.clone(), Arc::clone(&self.clock))
    }
}
