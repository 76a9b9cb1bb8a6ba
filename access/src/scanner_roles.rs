//! Staff scanner roles.
//!
//! An event owner on a plan with staff scanners can name email addresses
//! that may scan at the door. A logged-in user whose email holds an active
//! role resolves as a scanner (see [`EventAccessResolver`](crate::resolver::EventAccessResolver)).

use crate::error::{AccessError, Result};
use crate::providers::{AccessStore, ScannerRole};
use crate::resolver::EventAccess;
use crate::utils::normalize_email;
use guestgate_core::environment::Clock;
use std::sync::Arc;

/// Owner-only management of staff scanner roles.
#[derive(Clone)]
pub struct ScannerRoleService<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: AccessStore> ScannerRoleService<S> {
    /// Create a service over `store`.
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Make `email` an active scanner for the event, reactivating a revoked
    /// role.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The caller is not the owner → [`AccessError::Unauthorized`]
    /// - The owner's plan lacks staff scanners → [`AccessError::EntitlementRequired`]
    /// - The email is blank or has no `@` → [`AccessError::InvalidInput`]
    /// - The store write fails
    pub async fn grant(&self, access: &EventAccess, email: &str) -> Result<ScannerRole> {
        let email = self.authorize(access, email).await?;
        let role = self
            .store
            .activate_scanner_role(access.event_id(), &email)
            .await?;
        tracing::info!(event_id = %access.event_id(), scanner_email = %email, "Scanner role granted");
        Ok(role)
    }

    /// Revoke `email`'s scanner role. Returns `false` if it had none.
    ///
    /// # Errors
    ///
    /// Same as [`grant`](Self::grant).
    pub async fn revoke(&self, access: &EventAccess, email: &str) -> Result<bool> {
        let email = self.authorize(access, email).await?;
        let revoked = self
            .store
            .revoke_scanner_role(access.event_id(), &email, self.clock.now())
            .await?;
        tracing::info!(event_id = %access.event_id(), scanner_email = %email, revoked, "Scanner role revoked");
        Ok(revoked)
    }

    async fn authorize(&self, access: &EventAccess, email: &str) -> Result<String> {
        if !access.is_owner() {
            return Err(AccessError::Unauthorized);
        }
        if !self
            .store
            .owner_has_scanner_entitlement(access.owner_host_user_id())
            .await?
        {
            return Err(AccessError::EntitlementRequired);
        }
        normalize_email(email)
            .filter(|email| email.contains('@'))
            .ok_or_else(|| AccessError::invalid_input("scanner email must be an email address"))
    }
}
