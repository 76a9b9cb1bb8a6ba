//! `PostgreSQL` access store.
//!
//! One pool-backed store implements every provider trait. Queries are
//! built at runtime so the crate compiles without a live database.
//!
//! # Example
//!
//! ```no_run
//! use guestgate_access::stores::PostgresAccessStore;
//! use sqlx::PgPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgresql://localhost/guestgate").await?;
//! let store = PostgresAccessStore::new(pool);
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

mod access;
mod checkin;
mod events;
mod guests;
mod scanner_roles;

use crate::error::{AccessError, Result, StoreError};
use crate::providers::{GuestAccessRecord, GuestRecord};
use crate::token::TokenHash;
use guestgate_core::{AccessId, EventId, GuestEventStatus, GuestRequestId, GuestStatus};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

/// `PostgreSQL` store for events, guests, access grants and check-ins.
#[derive(Clone)]
pub struct PostgresAccessStore {
    /// `PostgreSQL` connection pool.
    pool: PgPool,
}

impl PostgresAccessStore {
    /// Create a new store.
    ///
    /// # Arguments
    ///
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Round-trip a trivial query.
    ///
    /// # Errors
    ///
    /// Returns error if the database is unreachable.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Ping failed", e))?;
        Ok(())
    }
}

/// Map a driver error, keeping uniqueness violations distinguishable.
fn db_error(context: &str, error: sqlx::Error) -> AccessError {
    if let sqlx::Error::Database(db) = &error {
        if db.is_unique_violation() {
            return StoreError::UniqueViolation {
                constraint: db.constraint().map(str::to_string),
            }
            .into();
        }
    }
    StoreError::Database(format!("{context}: {error}")).into()
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Database(format!("Failed to read column {name}: {e}")).into())
}

fn count(row: &PgRow) -> Result<u64> {
    let value: i64 = column(row, "count")?;
    Ok(u64::try_from(value).unwrap_or(0))
}

const GUEST_COLUMNS: &str = "id, event_id, display_name, status, payment_confirmed_at, recovery_code, \
     guest_event_status, guest_event_status_at, created_at";

fn guest_from_row(row: &PgRow) -> Result<GuestRecord> {
    let status: String = column(row, "status")?;
    let status = status
        .parse::<GuestStatus>()
        .map_err(|e| StoreError::Database(format!("Invalid guest status: {e}")))?;
    let event_status: Option<String> = column(row, "guest_event_status")?;
    let event_status = event_status
        .map(|value| value.parse::<GuestEventStatus>())
        .transpose()
        .map_err(|e| StoreError::Database(format!("Invalid guest event status: {e}")))?;

    Ok(GuestRecord {
        id: GuestRequestId::from(column::<String>(row, "id")?),
        event_id: EventId::from(column::<String>(row, "event_id")?),
        display_name: column(row, "display_name")?,
        status,
        payment_confirmed_at: column(row, "payment_confirmed_at")?,
        recovery_code: column(row, "recovery_code")?,
        event_status,
        event_status_at: column(row, "guest_event_status_at")?,
        created_at: column(row, "created_at")?,
    })
}

const ACCESS_COLUMNS: &str = "id, event_id, guest_request_id, token_hash, issued_at, revoked_at";

fn access_from_row(row: &PgRow) -> Result<GuestAccessRecord> {
    Ok(GuestAccessRecord {
        id: AccessId::from(column::<String>(row, "id")?),
        event_id: EventId::from(column::<String>(row, "event_id")?),
        guest_request_id: GuestRequestId::from(column::<String>(row, "guest_request_id")?),
        token_hash: TokenHash::from_stored(column(row, "token_hash")?),
        issued_at: column(row, "issued_at")?,
        revoked_at: column(row, "revoked_at")?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    // These tests need a disposable PostgreSQL database:
    //   GUESTGATE_TEST_DATABASE_URL=postgres://localhost/guestgate_test \
    //     cargo test -p guestgate-access --features postgres -- --ignored
    use super::*;
    use crate::providers::GuestAccessRepository;
    use chrono::Utc;

    const SCHEMA: &str = include_str!("../../../migrations/0001_guest_access_schema.sql");
    const SINGLE_HASH_COLUMN: &str = include_str!("../../../migrations/0002_single_token_hash_column.sql");

    async fn scratch_pool() -> PgPool {
        let url = std::env::var("GUESTGATE_TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/guestgate_test".to_string());
        let pool = PgPool::connect(&url).await.unwrap();
        sqlx::raw_sql(
            "DROP TABLE IF EXISTS checkins, guest_access, guest_requests, event_scanner_roles, \
             events, host_profiles, _sqlx_migrations CASCADE",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL running
    async fn test_hash_backfill_keeps_checked_in_grants() {
        let pool = scratch_pool().await;
        sqlx::raw_sql(SCHEMA).execute(&pool).await.unwrap();
        sqlx::raw_sql(
            r"
            INSERT INTO events (id, host_user_id, name) VALUES ('evt1', 'host1', 'Launch');
            INSERT INTO guest_requests (id, event_id, display_name, status)
                VALUES ('r1', 'evt1', 'Ada', 'APPROVED'), ('r2', 'evt1', 'Bob', 'APPROVED');
            INSERT INTO guest_access (id, event_id, guest_request_id, qr_token_hash)
                VALUES ('a1', 'evt1', 'r1', NULL), ('a2', 'evt1', 'r2', 'legacy-hash');
            INSERT INTO checkins (event_id, guest_access_id, checked_in_by)
                VALUES ('evt1', 'a1', 'host:host1');
            ",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::raw_sql(SINGLE_HASH_COLUMN).execute(&pool).await.unwrap();

        let checkins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM checkins")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(checkins, 1);

        let store = PostgresAccessStore::new(pool);
        let legacy = store
            .find_by_token_hash(&TokenHash::from_stored("legacy-hash".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(legacy.id, AccessId::from("a2"));

        let reissued = store
            .upsert_token_hash(
                &EventId::from("evt1"),
                &GuestRequestId::from("r1"),
                &TokenHash::from_stored("b".repeat(64)),
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(reissued.id, AccessId::from("a1"));
    }
}
