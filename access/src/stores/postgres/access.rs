//! [`GuestAccessRepository`] over the `guest_access` table.

use super::{ACCESS_COLUMNS, PostgresAccessStore, access_from_row, db_error};
use crate::error::Result;
use crate::providers::{GuestAccessRecord, GuestAccessRepository};
use crate::token::TokenHash;
use chrono::{DateTime, Utc};
use guestgate_core::{EventId, GuestRequestId};

impl GuestAccessRepository for PostgresAccessStore {
    async fn upsert_token_hash(
        &self,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
        token_hash: &TokenHash,
        issued_at: DateTime<Utc>,
    ) -> Result<GuestAccessRecord> {
        // Re-issuing clears a prior revocation along with the old hash.
        let query = format!(
            "INSERT INTO guest_access (event_id, guest_request_id, token_hash, issued_at, revoked_at) \
             VALUES ($1, $2, $3, $4, NULL) \
             ON CONFLICT (guest_request_id) DO UPDATE \
             SET token_hash = EXCLUDED.token_hash, issued_at = EXCLUDED.issued_at, revoked_at = NULL \
             RETURNING {ACCESS_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(event_id.as_str())
            .bind(guest_request_id.as_str())
            .bind(token_hash.as_str())
            .bind(issued_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to store token hash", e))?;

        access_from_row(&row)
    }

    async fn find_by_token_hash(&self, token_hash: &TokenHash) -> Result<Option<GuestAccessRecord>> {
        let query = format!("SELECT {ACCESS_COLUMNS} FROM guest_access WHERE token_hash = $1");
        let row = sqlx::query(&query)
            .bind(token_hash.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to look up token hash", e))?;

        row.as_ref().map(access_from_row).transpose()
    }

    async fn revoke_for_guest(
        &self,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
        revoked_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE guest_access
            SET revoked_at = COALESCE(revoked_at, $1)
            WHERE guest_request_id = $2 AND event_id = $3
            ",
        )
        .bind(revoked_at)
        .bind(guest_request_id.as_str())
        .bind(event_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to revoke access", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn restore_for_guest(&self, event_id: &EventId, guest_request_id: &GuestRequestId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE guest_access SET revoked_at = NULL WHERE guest_request_id = $1 AND event_id = $2",
        )
        .bind(guest_request_id.as_str())
        .bind(event_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to restore access", e))?;

        Ok(result.rows_affected() > 0)
    }
}
