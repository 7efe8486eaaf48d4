//! Database operations for the `ebay_categories` table.

use chrono::{DateTime, Utc};
use flipdesk_core::CategoryRecord;
use sqlx::PgPool;

use crate::DbError;

/// Ancestor walks stop after this many hops so a corrupted parent chain
/// cannot loop forever.
const MAX_PATH_DEPTH: i32 = 32;

/// A row from the `ebay_categories` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CategoryRow {
    pub ebay_category_id: String,
    pub category_name: String,
    pub parent_ebay_category_id: Option<String>,
    pub leaf_category: bool,
    pub is_active: bool,
    pub last_updated: DateTime<Utc>,
}

/// Outcome of one batched upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertCounts {
    pub inserted: u64,
    pub updated: u64,
}

impl UpsertCounts {
    #[must_use]
    pub fn written(&self) -> u64 {
        self.inserted + self.updated
    }
}

/// Upserts a batch of category records keyed by `ebay_category_id`.
///
/// Every written row gets `last_updated = touched_at`, which lets a full
/// resync retire rows it did not touch. Uses a single
/// `INSERT … SELECT * FROM UNNEST(…) ON CONFLICT` per call. The batch must
/// not contain the same id twice (Postgres rejects a row updated twice in
/// one statement).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn upsert_categories(
    pool: &PgPool,
    records: &[CategoryRecord],
    touched_at: DateTime<Utc>,
) -> Result<UpsertCounts, DbError> {
    if records.is_empty() {
        return Ok(UpsertCounts::default());
    }

    let mut ids: Vec<String> = Vec::with_capacity(records.len());
    let mut names: Vec<String> = Vec::with_capacity(records.len());
    let mut parents: Vec<Option<String>> = Vec::with_capacity(records.len());
    let mut leaves: Vec<bool> = Vec::with_capacity(records.len());
    let mut actives: Vec<bool> = Vec::with_capacity(records.len());

    for record in records {
        ids.push(record.ebay_category_id.clone());
        names.push(record.category_name.clone());
        parents.push(record.parent_ebay_category_id.clone());
        leaves.push(record.leaf_category);
        actives.push(record.is_active);
    }

    let rows: Vec<bool> = sqlx::query_scalar::<_, bool>(
        "INSERT INTO ebay_categories \
             (ebay_category_id, category_name, parent_ebay_category_id, leaf_category, \
              is_active, last_updated) \
         SELECT u.id, u.name, u.parent, u.leaf, u.active, $6 \
         FROM UNNEST($1::text[], $2::text[], $3::text[], $4::bool[], $5::bool[]) \
              AS u(id, name, parent, leaf, active) \
         ON CONFLICT (ebay_category_id) DO UPDATE SET \
             category_name           = EXCLUDED.category_name, \
             parent_ebay_category_id = EXCLUDED.parent_ebay_category_id, \
             leaf_category           = EXCLUDED.leaf_category, \
             is_active               = EXCLUDED.is_active, \
             last_updated            = EXCLUDED.last_updated \
         RETURNING (xmax = 0) AS is_new",
    )
    .bind(&ids)
    .bind(&names)
    .bind(&parents)
    .bind(&leaves)
    .bind(&actives)
    .bind(touched_at)
    .fetch_all(pool)
    .await?;

    let inserted = rows.iter().filter(|&&is_new| is_new).count() as u64;
    let updated = rows.len() as u64 - inserted;

    Ok(UpsertCounts { inserted, updated })
}

/// Marks every active category last written before `before` as inactive.
///
/// Called at the end of a full resync with the run's start time, so any
/// category eBay no longer returns drops out of the active set without the
/// table ever being empty. Returns the number of rows retired.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn deactivate_stale_categories(
    pool: &PgPool,
    before: DateTime<Utc>,
) -> Result<u64, DbError> {
    let rows_affected = sqlx::query(
        "UPDATE ebay_categories \
         SET is_active = FALSE \
         WHERE is_active = TRUE AND last_updated < $1",
    )
    .bind(before)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected)
}

/// Returns the newest `last_updated` among active categories, or `None` when
/// nothing has been synced yet.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_category_update(pool: &PgPool) -> Result<Option<DateTime<Utc>>, DbError> {
    let latest = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
        "SELECT MAX(last_updated) FROM ebay_categories WHERE is_active = TRUE",
    )
    .fetch_one(pool)
    .await?;

    Ok(latest)
}

/// Number of rows in `ebay_categories`, active or not.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_categories(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ebay_categories")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Number of active rows in `ebay_categories`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_active_categories(pool: &PgPool) -> Result<i64, DbError> {
    let count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ebay_categories WHERE is_active = TRUE")
            .fetch_one(pool)
            .await?;
    Ok(count)
}

/// Returns an active category by id, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_category(
    pool: &PgPool,
    ebay_category_id: &str,
) -> Result<Option<CategoryRow>, DbError> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "SELECT ebay_category_id, category_name, parent_ebay_category_id, leaf_category, \
                is_active, last_updated \
         FROM ebay_categories \
         WHERE ebay_category_id = $1 AND is_active = TRUE",
    )
    .bind(ebay_category_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns the active direct children of a category, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_child_categories(
    pool: &PgPool,
    parent_ebay_category_id: &str,
) -> Result<Vec<CategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT ebay_category_id, category_name, parent_ebay_category_id, leaf_category, \
                is_active, last_updated \
         FROM ebay_categories \
         WHERE parent_ebay_category_id = $1 AND is_active = TRUE \
         ORDER BY category_name, ebay_category_id",
    )
    .bind(parent_ebay_category_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns the category names from the root down to `ebay_category_id`.
///
/// Empty when the category is unknown or retired. The walk stops at the
/// first retired ancestor and is capped at
/// [`MAX_PATH_DEPTH`] hops.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn category_path(pool: &PgPool, ebay_category_id: &str) -> Result<Vec<String>, DbError> {
    let names = sqlx::query_scalar::<_, String>(
        "WITH RECURSIVE ancestors AS ( \
             SELECT ebay_category_id, category_name, parent_ebay_category_id, 0 AS depth \
             FROM ebay_categories \
             WHERE ebay_category_id = $1 AND is_active = TRUE \
           UNION ALL \
             SELECT c.ebay_category_id, c.category_name, c.parent_ebay_category_id, a.depth + 1 \
             FROM ebay_categories c \
             JOIN ancestors a ON c.ebay_category_id = a.parent_ebay_category_id \
             WHERE a.depth < $2 AND c.is_active = TRUE \
         ) \
         SELECT category_name FROM ancestors ORDER BY depth DESC",
    )
    .bind(ebay_category_id)
    .bind(MAX_PATH_DEPTH)
    .fetch_all(pool)
    .await?;

    Ok(names)
}
