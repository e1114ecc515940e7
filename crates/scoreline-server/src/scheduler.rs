//! In-process periodic ticks.
//!
//! Registers the source-fetch and saved-query ticks on the configured cron
//! expressions, plus an hourly prune of settled job records. External cron
//! services can drive the same ticks through `GET /cron/{scheduler}`.

use std::sync::Arc;

use chrono::Utc;
use scoreline_core::AppConfig;
use scoreline_db::SharedStore;
use scoreline_jobs::JobQueue;
use scoreline_pipeline::{tick_queries, tick_sources};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

const PRUNE_CRON: &str = "0 0 * * * *";

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, a
/// cron expression is rejected, or the scheduler fails to start.
pub async fn build_scheduler(
    store: SharedStore,
    queue: JobQueue,
    config: &AppConfig,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_source_tick(
        &scheduler,
        Arc::clone(&store),
        queue.clone(),
        &config.source_tick_cron,
    )
    .await?;
    register_query_tick(&scheduler, store, queue.clone(), &config.query_tick_cron).await?;
    register_prune_job(&scheduler, queue).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_source_tick(
    scheduler: &JobScheduler,
    store: SharedStore,
    queue: JobQueue,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let store = Arc::clone(&store);
        let queue = queue.clone();

        Box::pin(async move {
            if let Err(e) = tick_sources(store.as_ref(), &queue, Utc::now()).await {
                tracing::error!(error = %e, "scheduler: source tick failed");
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: source-fetch tick registered");
    Ok(())
}

async fn register_query_tick(
    scheduler: &JobScheduler,
    store: SharedStore,
    queue: JobQueue,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let store = Arc::clone(&store);
        let queue = queue.clone();

        Box::pin(async move {
            if let Err(e) = tick_queries(store.as_ref(), &queue, Utc::now()).await {
                tracing::error!(error = %e, "scheduler: query tick failed");
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: scheduled-queries tick registered");
    Ok(())
}

async fn register_prune_job(
    scheduler: &JobScheduler,
    queue: JobQueue,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(PRUNE_CRON, move |_uuid, _lock| {
        let queue = queue.clone();

        Box::pin(async move {
            let pruned = queue.prune(Utc::now());
            if pruned > 0 {
                tracing::info!(pruned, "scheduler: pruned settled job records");
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
