//! [`CheckinStore`] over the `checkins` table.
//!
//! Idempotency rests on `UNIQUE (event_id, guest_access_id)`; a duplicate
//! insert surfaces as [`StoreError::UniqueViolation`](crate::error::StoreError::UniqueViolation).

use super::{PostgresAccessStore, column, count, db_error};
use crate::error::Result;
use crate::providers::{CheckinRecord, CheckinStore, NewCheckin};
use guestgate_core::EventId;

impl CheckinStore for PostgresAccessStore {
    async fn insert_checkin(&self, checkin: NewCheckin) -> Result<CheckinRecord> {
        let row = sqlx::query(
            r"
            INSERT INTO checkins (event_id, guest_access_id, checked_in_by, checked_in_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(checkin.event_id.as_str())
        .bind(checkin.access_id.as_str())
        .bind(&checkin.checked_in_by)
        .bind(checkin.checked_in_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to record check-in", e))?;

        Ok(CheckinRecord {
            id: column(&row, "id")?,
            event_id: checkin.event_id,
            access_id: checkin.access_id,
            checked_in_by: checkin.checked_in_by,
            checked_in_at: checkin.checked_in_at,
        })
    }

    async fn count_for_event(&self, event_id: &EventId) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM checkins WHERE event_id = $1")
            .bind(event_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to count check-ins", e))?;

        count(&row)
    }
}
