//! [`ScannerRoleRepository`] over the `event_scanner_roles` table.

use super::{PostgresAccessStore, column, db_error};
use crate::error::Result;
use crate::providers::{ScannerRole, ScannerRoleRepository, ScannerRoleStatus};
use chrono::{DateTime, Utc};
use guestgate_core::EventId;

impl ScannerRoleRepository for PostgresAccessStore {
    async fn activate_scanner_role(&self, event_id: &EventId, email: &str) -> Result<ScannerRole> {
        let row = sqlx::query(
            r"
            INSERT INTO event_scanner_roles (event_id, scanner_email, status, revoked_at)
            VALUES ($1, $2, 'ACTIVE', NULL)
            ON CONFLICT (event_id, scanner_email) DO UPDATE
            SET status = 'ACTIVE', revoked_at = NULL
            RETURNING event_id, scanner_email, status, revoked_at
            ",
        )
        .bind(event_id.as_str())
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to store scanner role", e))?;

        let status: String = column(&row, "status")?;
        Ok(ScannerRole {
            event_id: EventId::from(column::<String>(&row, "event_id")?),
            scanner_email: column(&row, "scanner_email")?,
            status: ScannerRoleStatus::from_column(&status),
            revoked_at: column(&row, "revoked_at")?,
        })
    }

    async fn revoke_scanner_role(
        &self,
        event_id: &EventId,
        email: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE event_scanner_roles
            SET status = 'REVOKED', revoked_at = $1
            WHERE event_id = $2 AND lower(scanner_email) = $3
            ",
        )
        .bind(revoked_at)
        .bind(event_id.as_str())
        .bind(email)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to revoke scanner role", e))?;

        Ok(result.rows_affected() > 0)
    }
}
