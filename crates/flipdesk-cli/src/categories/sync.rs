use flipdesk_categories::{run_recorded_sync, SyncOptions, SyncOutcome, TriggerSource};
use flipdesk_core::AppConfig;

/// Runs a recorded category sync and prints its outcome.
///
/// # Errors
///
/// Returns an error if eBay credentials are missing, the run cannot be
/// recorded, or the sync itself fails.
pub(super) async fn run_sync(
    config: &AppConfig,
    full_resync: bool,
    parent_id: Option<String>,
) -> anyhow::Result<()> {
    let ebay = super::ebay_client(config)?;
    let pool = crate::connect(config).await?;

    let options = SyncOptions {
        full_resync,
        parent_id,
    };
    let recorded = run_recorded_sync(
        &pool,
        &ebay,
        &config.category_sync,
        &options,
        TriggerSource::Cli,
    )
    .await?;

    let run_id = recorded.run.public_id;
    match recorded.result {
        Ok(SyncOutcome::Completed(summary)) => {
            println!(
                "sync {run_id} succeeded: {} written ({} new, {} updated) in {} batches",
                summary.inserted_count, summary.new_rows, summary.updated_rows, summary.batches
            );
            if summary.retired_count > 0 {
                println!("retired {} categories eBay no longer lists", summary.retired_count);
            }
            Ok(())
        }
        Ok(SyncOutcome::Skipped { last_updated }) => {
            println!(
                "sync {run_id} skipped: categories refreshed at {}; pass --full to force",
                last_updated.format("%Y-%m-%d %H:%M UTC")
            );
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("sync {run_id} failed: {e}")),
    }
}

/// Prints the most recent sync runs.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(super) async fn run_list_runs(config: &AppConfig, limit: i64) -> anyhow::Result<()> {
    let pool = crate::connect(config).await?;
    let runs = flipdesk_db::list_sync_runs(&pool, limit.clamp(1, 200)).await?;

    if runs.is_empty() {
        println!("no sync runs recorded; run `categories sync` first");
        return Ok(());
    }

    println!(
        "{:<38}{:<11}{:<13}{:<11}{:<10}{:<18}ERROR",
        "RUN", "TRIGGER", "MODE", "STATUS", "RECORDS", "CREATED"
    );
    for run in &runs {
        println!(
            "{:<38}{:<11}{:<13}{:<11}{:<10}{:<18}{}",
            run.public_id,
            run.trigger_source,
            run.sync_mode,
            run.status,
            run.records_processed,
            run.created_at.format("%Y-%m-%d %H:%M"),
            run.error_message.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
