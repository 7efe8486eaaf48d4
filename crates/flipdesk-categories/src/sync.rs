//! Category tree sync: fetch, flatten, batch-upsert, retire.
//!
//! The pipeline is generic over where the tree comes from
//! ([`CategoryTreeSource`]) and where records go ([`CategoryStore`]), so the
//! batching and freshness rules can be exercised without eBay or Postgres.

use chrono::{DateTime, Duration, Utc};
use flipdesk_core::{flatten, flatten_under, CategoryNode, CategoryRecord, CategorySyncConfig};
use flipdesk_db::{DbError, UpsertCounts};
use flipdesk_ebay::{EbayClient, EbayError};
use sqlx::PgPool;

use crate::error::CategorySyncError;

/// Anything that can hand back an eBay category tree.
#[allow(async_fn_in_trait)]
pub trait CategoryTreeSource {
    /// Full tree when `parent_id` is `None`, otherwise the subtree rooted at
    /// `parent_id`.
    async fn fetch_tree(&self, parent_id: Option<&str>) -> Result<CategoryNode, EbayError>;
}

impl CategoryTreeSource for EbayClient {
    async fn fetch_tree(&self, parent_id: Option<&str>) -> Result<CategoryNode, EbayError> {
        self.fetch_category_tree(parent_id).await
    }
}

/// Persistence operations the sync needs.
#[allow(async_fn_in_trait)]
pub trait CategoryStore {
    async fn latest_update(&self) -> Result<Option<DateTime<Utc>>, DbError>;

    /// Parent id of an already-stored category, `None` for a root or an
    /// unknown id.
    async fn stored_parent(&self, category_id: &str) -> Result<Option<String>, DbError>;

    async fn upsert_batch(
        &self,
        records: &[CategoryRecord],
        touched_at: DateTime<Utc>,
    ) -> Result<UpsertCounts, DbError>;

    /// Deactivates rows last written before `before`; returns how many.
    async fn retire_stale(&self, before: DateTime<Utc>) -> Result<u64, DbError>;
}

impl CategoryStore for PgPool {
    async fn latest_update(&self) -> Result<Option<DateTime<Utc>>, DbError> {
        flipdesk_db::latest_category_update(self).await
    }

    async fn stored_parent(&self, category_id: &str) -> Result<Option<String>, DbError> {
        let row = flipdesk_db::get_category(self, category_id).await?;
        Ok(row.and_then(|r| r.parent_ebay_category_id))
    }

    async fn upsert_batch(
        &self,
        records: &[CategoryRecord],
        touched_at: DateTime<Utc>,
    ) -> Result<UpsertCounts, DbError> {
        flipdesk_db::upsert_categories(self, records, touched_at).await
    }

    async fn retire_stale(&self, before: DateTime<Utc>) -> Result<u64, DbError> {
        flipdesk_db::deactivate_stale_categories(self, before).await
    }
}

/// Per-invocation sync switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Ignore the freshness window and retire categories eBay no longer
    /// returns.
    pub full_resync: bool,
    /// Sync only the subtree under this category.
    pub parent_id: Option<String>,
}

/// Result of [`persist`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistSummary {
    /// Records written across all batches, new or overwritten.
    pub inserted_count: usize,
    pub new_rows: u64,
    pub updated_rows: u64,
    pub retired_count: u64,
    pub batches: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The table was refreshed inside the freshness window.
    Skipped { last_updated: DateTime<Utc> },
    Completed(PersistSummary),
}

impl SyncOutcome {
    #[must_use]
    pub fn inserted_count(&self) -> usize {
        match self {
            SyncOutcome::Skipped { .. } => 0,
            SyncOutcome::Completed(summary) => summary.inserted_count,
        }
    }
}

/// Writes `records` in sequential batches of `batch_size`.
///
/// Every row is stamped with `touched_at`. With `full_resync`, rows not
/// touched by this call are deactivated once all batches have landed, so
/// readers filtering on `is_active` never see an empty table. Stops at the
/// first failed batch; earlier batches stay committed.
///
/// # Errors
///
/// - [`CategorySyncError::InvalidConfig`] if `batch_size` is zero.
/// - [`CategorySyncError::Persistence`] if a batch or the retirement fails.
pub async fn persist<S: CategoryStore>(
    store: &S,
    records: &[CategoryRecord],
    batch_size: usize,
    full_resync: bool,
    touched_at: DateTime<Utc>,
) -> Result<PersistSummary, CategorySyncError> {
    if batch_size == 0 {
        return Err(CategorySyncError::InvalidConfig(
            "batch size must be greater than zero".to_string(),
        ));
    }

    let total = records.len().div_ceil(batch_size);
    let mut summary = PersistSummary::default();

    for (index, batch) in records.chunks(batch_size).enumerate() {
        let counts = store
            .upsert_batch(batch, touched_at)
            .await
            .map_err(|source| CategorySyncError::Persistence {
                stage: format!("batch {} of {total}", index + 1),
                written: summary.inserted_count,
                source,
            })?;

        summary.inserted_count += batch.len();
        summary.new_rows += counts.inserted;
        summary.updated_rows += counts.updated;
        summary.batches += 1;

        tracing::debug!(
            batch = index + 1,
            total,
            written = counts.written(),
            inserted = counts.inserted,
            updated = counts.updated,
            "category batch written"
        );
    }

    if full_resync {
        summary.retired_count = store.retire_stale(touched_at).await.map_err(|source| {
            CategorySyncError::Persistence {
                stage: "retire stale categories".to_string(),
                written: summary.inserted_count,
                source,
            }
        })?;
    }

    Ok(summary)
}

/// Fetches the category tree from `source` and stores it in `store`.
///
/// Unless `options.full_resync` is set, returns [`SyncOutcome::Skipped`] when
/// the newest stored category is younger than
/// `config.recent_window_hours`.
///
/// # Errors
///
/// - [`CategorySyncError::InvalidConfig`] for a zero batch size or a full
///   resync scoped to a subtree.
/// - [`CategorySyncError::Fetch`] if eBay cannot be reached or authenticated.
/// - [`CategorySyncError::MalformedTree`] if the tree repeats a category id.
/// - [`CategorySyncError::Persistence`] if the store fails.
pub async fn sync_categories<T, S>(
    source: &T,
    store: &S,
    config: &CategorySyncConfig,
    options: &SyncOptions,
) -> Result<SyncOutcome, CategorySyncError>
where
    T: CategoryTreeSource,
    S: CategoryStore,
{
    if config.batch_size == 0 {
        return Err(CategorySyncError::InvalidConfig(
            "batch size must be greater than zero".to_string(),
        ));
    }
    if options.full_resync && options.parent_id.is_some() {
        return Err(CategorySyncError::InvalidConfig(
            "a full resync cannot be scoped to a subtree".to_string(),
        ));
    }

    let started_at = Utc::now();

    if !options.full_resync {
        let latest = store
            .latest_update()
            .await
            .map_err(|source| CategorySyncError::Persistence {
                stage: "freshness check".to_string(),
                written: 0,
                source,
            })?;
        if let Some(last_updated) = latest {
            if started_at - last_updated < Duration::hours(config.recent_window_hours) {
                tracing::info!(
                    %last_updated,
                    window_hours = config.recent_window_hours,
                    "categories are fresh; skipping sync"
                );
                return Ok(SyncOutcome::Skipped { last_updated });
            }
        }
    }

    let parent_id = options.parent_id.as_deref();
    let tree = source.fetch_tree(parent_id).await?;
    let records = match parent_id {
        // A subtree root stays attached to whatever parent it already has.
        Some(subtree_root) => {
            let attached_to = store.stored_parent(subtree_root).await.map_err(|source| {
                CategorySyncError::Persistence {
                    stage: "subtree parent lookup".to_string(),
                    written: 0,
                    source,
                }
            })?;
            flatten_under(&tree, attached_to.as_deref())?
        }
        None => flatten(&tree)?,
    };
    tracing::info!(
        root = %tree.category_id,
        records = records.len(),
        full_resync = options.full_resync,
        "flattened category tree"
    );
    drop(tree);

    let summary = persist(
        store,
        &records,
        config.batch_size,
        options.full_resync,
        started_at,
    )
    .await?;

    tracing::info!(
        inserted_count = summary.inserted_count,
        new_rows = summary.new_rows,
        retired = summary.retired_count,
        batches = summary.batches,
        "category sync completed"
    );

    Ok(SyncOutcome::Completed(summary))
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
