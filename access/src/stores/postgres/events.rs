//! [`EventDirectory`] over the `events`, `host_profiles` and
//! `event_scanner_roles` tables.

use super::{PostgresAccessStore, column, db_error};
use crate::error::{Result, StoreError};
use crate::providers::{EventDirectory, EventRecord, ScannerRole, ScannerRoleStatus};
use guestgate_core::{EventId, HostUserId};

impl EventDirectory for PostgresAccessStore {
    async fn find_event(&self, event_id: &EventId) -> Result<Option<EventRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, name, host_user_id, capacity, requires_payment, scanner_access_code
            FROM events
            WHERE id = $1
            ",
        )
        .bind(event_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load event", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let capacity: Option<i32> = column(&row, "capacity")?;
        let capacity = capacity
            .map(u32::try_from)
            .transpose()
            .map_err(|e| StoreError::Database(format!("Invalid capacity: {e}")))?;

        Ok(Some(EventRecord {
            id: EventId::from(column::<String>(&row, "id")?),
            name: column(&row, "name")?,
            host_user_id: HostUserId::from(column::<String>(&row, "host_user_id")?),
            capacity,
            requires_payment: column(&row, "requires_payment")?,
            scanner_access_code: column(&row, "scanner_access_code")?,
        }))
    }

    async fn owner_has_scanner_entitlement(&self, host_user_id: &HostUserId) -> Result<bool> {
        let row = sqlx::query("SELECT is_pro FROM host_profiles WHERE user_id = $1")
            .bind(host_user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load host profile", e))?;

        match row {
            Some(row) => column(&row, "is_pro"),
            None => Ok(false),
        }
    }

    async fn find_active_scanner_role(
        &self,
        event_id: &EventId,
        email: &str,
    ) -> Result<Option<ScannerRole>> {
        let row = sqlx::query(
            r"
            SELECT event_id, scanner_email, status, revoked_at
            FROM event_scanner_roles
            WHERE event_id = $1
              AND lower(scanner_email) = $2
              AND status = 'ACTIVE'
              AND revoked_at IS NULL
            LIMIT 1
            ",
        )
        .bind(event_id.as_str())
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load scanner role", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status: String = column(&row, "status")?;
        Ok(Some(ScannerRole {
            event_id: EventId::from(column::<String>(&row, "event_id")?),
            scanner_email: column(&row, "scanner_email")?,
            status: ScannerRoleStatus::from_column(&status),
            revoked_at: column(&row, "revoked_at")?,
        }))
    }
}
