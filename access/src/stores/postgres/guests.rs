//! [`GuestRepository`] over the `guest_requests` table.

use super::{GUEST_COLUMNS, PostgresAccessStore, count, db_error, guest_from_row};
use crate::error::Result;
use crate::providers::{GuestRecord, GuestRepository, NewGuestRequest};
use chrono::{DateTime, Utc};
use guestgate_core::{EventId, GuestEventStatus, GuestRequestId, GuestStatus};

impl GuestRepository for PostgresAccessStore {
    async fn find_guest(
        &self,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
    ) -> Result<Option<GuestRecord>> {
        let query = format!("SELECT {GUEST_COLUMNS} FROM guest_requests WHERE id = $1 AND event_id = $2");
        let row = sqlx::query(&query)
            .bind(guest_request_id.as_str())
            .bind(event_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load guest request", e))?;

        row.as_ref().map(guest_from_row).transpose()
    }

    async fn create_guest_request(&self, request: NewGuestRequest) -> Result<GuestRecord> {
        let query = format!(
            "INSERT INTO guest_requests (event_id, display_name, recovery_code, status, created_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {GUEST_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(request.event_id.as_str())
            .bind(&request.display_name)
            .bind(&request.recovery_code)
            .bind(request.status.as_str())
            .bind(request.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to create guest request", e))?;

        guest_from_row(&row)
    }

    async fn find_by_recovery_code(
        &self,
        event_id: &EventId,
        recovery_code: &str,
    ) -> Result<Option<GuestRecord>> {
        let query = format!(
            "SELECT {GUEST_COLUMNS} FROM guest_requests \
             WHERE event_id = $1 AND recovery_code = $2 \
             ORDER BY created_at DESC LIMIT 1"
        );
        let row = sqlx::query(&query)
            .bind(event_id.as_str())
            .bind(recovery_code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to look up recovery code", e))?;

        row.as_ref().map(guest_from_row).transpose()
    }

    async fn set_status(
        &self,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
        status: GuestStatus,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE guest_requests SET status = $1 WHERE id = $2 AND event_id = $3")
            .bind(status.as_str())
            .bind(guest_request_id.as_str())
            .bind(event_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to update guest status", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn confirm_payment(
        &self,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
        confirmed_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE guest_requests
            SET payment_confirmed_at = COALESCE(payment_confirmed_at, $1)
            WHERE id = $2 AND event_id = $3
            ",
        )
        .bind(confirmed_at)
        .bind(guest_request_id.as_str())
        .bind(event_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to confirm payment", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_event_status(
        &self,
        event_id: &EventId,
        guest_request_id: &GuestRequestId,
        event_status: GuestEventStatus,
        reported_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE guest_requests
            SET status = $1, guest_event_status = $2, guest_event_status_at = $3
            WHERE id = $4 AND event_id = $5
            ",
        )
        .bind(event_status.guest_status().as_str())
        .bind(event_status.as_str())
        .bind(reported_at)
        .bind(guest_request_id.as_str())
        .bind(event_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to record guest event status", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_approved(&self, event_id: &EventId) -> Result<u64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM guest_requests WHERE event_id = $1 AND status = 'APPROVED'",
        )
        .bind(event_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to count approved guests", e))?;

        count(&row)
    }
}
