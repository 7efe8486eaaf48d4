//! Background job scheduler.
//!
//! Registers the recurring category sync at server startup.

use std::sync::Arc;

use flipdesk_categories::{run_recorded_sync, SyncOptions, SyncOutcome, TriggerSource};
use flipdesk_core::AppConfig;
use flipdesk_ebay::EbayClient;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`]; dropping it stops all jobs. Without
/// an eBay client there is nothing to schedule and the scheduler starts
/// empty.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    ebay: Option<Arc<EbayClient>>,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    match ebay {
        Some(ebay) => register_category_sync_job(&scheduler, pool, ebay, config).await?,
        None => tracing::warn!("scheduler: eBay credentials missing; category sync not scheduled"),
    }

    scheduler.start().await?;
    Ok(scheduler)
}

/// Registers the incremental category sync on `category_sync_cron`
/// (daily at 03:00 UTC by default). Runs inside the freshness window end as
/// `skipped`.
async fn register_category_sync_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    ebay: Arc<EbayClient>,
    config: Arc<AppConfig>,
) -> Result<(), JobSchedulerError> {
    let cron = config.category_sync_cron.clone();
    let pool = Arc::new(pool);

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let ebay = Arc::clone(&ebay);
        let config = Arc::clone(&config);

        Box::pin(async move {
            tracing::info!("scheduler: starting category sync");
            run_category_sync_job(&pool, &ebay, &config).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: category sync registered");
    Ok(())
}

async fn run_category_sync_job(pool: &PgPool, ebay: &EbayClient, config: &AppConfig) {
    let recorded = match run_recorded_sync(
        pool,
        ebay,
        &config.category_sync,
        &SyncOptions::default(),
        TriggerSource::Scheduler,
    )
    .await
    {
        Ok(recorded) => recorded,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: could not record category sync run");
            return;
        }
    };

    match recorded.result {
        Ok(SyncOutcome::Completed(summary)) => tracing::info!(
            run_id = %recorded.run.public_id,
            inserted_count = summary.inserted_count,
            "scheduler: category sync complete"
        ),
        Ok(SyncOutcome::Skipped { last_updated }) => tracing::info!(
            run_id = %recorded.run.public_id,
            %last_updated,
            "scheduler: category sync skipped; table is fresh"
        ),
        // Already logged and recorded on the run row.
        Err(_) => {}
    }
}
