//! Sync runs recorded in `category_sync_runs`.

use flipdesk_core::CategorySyncConfig;
use flipdesk_db::{DbError, SyncRunRow};
use sqlx::PgPool;

use crate::error::CategorySyncError;
use crate::sync::{sync_categories, CategoryTreeSource, SyncOptions, SyncOutcome};

/// Who asked for a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Cli,
    Api,
    Scheduler,
}

impl TriggerSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerSource::Cli => "cli",
            TriggerSource::Api => "api",
            TriggerSource::Scheduler => "scheduler",
        }
    }
}

fn sync_mode(options: &SyncOptions) -> &'static str {
    if options.full_resync {
        "full"
    } else {
        "incremental"
    }
}

/// A finished run: its ledger row and what the sync itself returned.
#[derive(Debug)]
pub struct RecordedSync {
    pub run: SyncRunRow,
    pub result: Result<SyncOutcome, CategorySyncError>,
}

/// Runs [`sync_categories`] against Postgres inside a ledger row.
///
/// The row moves `queued → running` before the sync starts and ends as
/// `succeeded`, `skipped` or `failed`. A failure to write the final status is
/// logged, not returned, so the sync result is never lost.
///
/// # Errors
///
/// Returns [`DbError`] only if the run row cannot be created, started or
/// read back.
pub async fn run_recorded_sync<T: CategoryTreeSource>(
    pool: &PgPool,
    source: &T,
    config: &CategorySyncConfig,
    options: &SyncOptions,
    trigger: TriggerSource,
) -> Result<RecordedSync, DbError> {
    let run = flipdesk_db::create_sync_run(pool, trigger.as_str(), sync_mode(options)).await?;
    flipdesk_db::start_sync_run(pool, run.id).await?;

    tracing::info!(
        run_id = run.id,
        public_id = %run.public_id,
        trigger = trigger.as_str(),
        mode = sync_mode(options),
        "category sync run started"
    );

    let result = sync_categories(source, pool, config, options).await;

    let finished = match &result {
        Ok(SyncOutcome::Completed(summary)) => {
            let records = i32::try_from(summary.inserted_count).unwrap_or(i32::MAX);
            flipdesk_db::complete_sync_run(pool, run.id, records).await
        }
        Ok(SyncOutcome::Skipped { .. }) => flipdesk_db::skip_sync_run(pool, run.id).await,
        Err(err) => {
            tracing::error!(run_id = run.id, error = %err, "category sync run failed");
            let records = i32::try_from(err.records_written()).unwrap_or(i32::MAX);
            flipdesk_db::fail_sync_run(pool, run.id, records, &err.to_string()).await
        }
    };
    if let Err(mark_err) = finished {
        tracing::error!(
            run_id = run.id,
            error = %mark_err,
            "failed to record category sync run status"
        );
    }

    let run = flipdesk_db::get_sync_run(pool, run.id).await?;
    Ok(RecordedSync { run, result })
}
