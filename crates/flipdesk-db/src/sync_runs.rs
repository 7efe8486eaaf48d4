//! Database operations for `category_sync_runs`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `category_sync_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub trigger_source: String,
    pub sync_mode: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// The schema defines this as `INTEGER NOT NULL DEFAULT 0`.
    pub records_processed: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

const RUN_COLUMNS: &str = "id, public_id, trigger_source, sync_mode, status, \
                           started_at, completed_at, records_processed, error_message, created_at";

/// Creates a new sync run in `queued` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a check-constraint
/// violation for an unknown trigger source or mode).
pub async fn create_sync_run(
    pool: &PgPool,
    trigger_source: &str,
    sync_mode: &str,
) -> Result<SyncRunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, SyncRunRow>(&format!(
        "INSERT INTO category_sync_runs (public_id, trigger_source, sync_mode, status) \
         VALUES ($1, $2, $3, 'queued') \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(public_id)
    .bind(trigger_source)
    .bind(sync_mode)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not queued, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn start_sync_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE category_sync_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncRunTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Marks a run as `succeeded` with the number of categories written.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not running, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_sync_run(
    pool: &PgPool,
    id: i64,
    records_processed: i32,
) -> Result<(), DbError> {
    finish_running(pool, id, "succeeded", records_processed, None).await
}

/// Marks a run as `skipped`; the category table was fresh enough.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not running, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn skip_sync_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    finish_running(pool, id, "skipped", 0, None).await
}

/// Marks a run as `failed` and records the error. `records_processed` keeps
/// whatever batches were committed before the failure.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not running, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_sync_run(
    pool: &PgPool,
    id: i64,
    records_processed: i32,
    error_message: &str,
) -> Result<(), DbError> {
    finish_running(pool, id, "failed", records_processed, Some(error_message)).await
}

async fn finish_running(
    pool: &PgPool,
    id: i64,
    status: &str,
    records_processed: i32,
    error_message: Option<&str>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE category_sync_runs \
         SET status = $1, completed_at = NOW(), records_processed = $2, error_message = $3 \
         WHERE id = $4 AND status = 'running'",
    )
    .bind(status)
    .bind(records_processed)
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Fetches a single run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_sync_run(pool: &PgPool, id: i64) -> Result<SyncRunRow, DbError> {
    let row = sqlx::query_as::<_, SyncRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM category_sync_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sync_runs(pool: &PgPool, limit: i64) -> Result<Vec<SyncRunRow>, DbError> {
    let rows = sqlx::query_as::<_, SyncRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM category_sync_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
