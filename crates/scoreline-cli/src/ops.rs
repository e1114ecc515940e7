//! Command handlers for the CLI.
//!
//! Each command runs against the same in-process queue and pipeline the
//! server uses, then waits for the queue to drain before returning.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use scoreline_db::{PgStore, SharedStore};
use scoreline_jobs::{JobQueue, QueueConfig};
use scoreline_pipeline::{
    tick_queries, tick_sources, trigger_source_fetch, Pipeline, TriggerOutcome, TRIGGER_MANUAL,
};
use sqlx::PgPool;
use uuid::Uuid;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(600);

pub(crate) struct Runtime {
    store: SharedStore,
    queue: JobQueue,
    pipeline: Arc<Pipeline>,
}

impl Runtime {
    /// Builds the Postgres-backed pipeline and starts the job workers.
    pub(crate) fn start(
        config: &scoreline_core::AppConfig,
        pool: PgPool,
    ) -> anyhow::Result<Self> {
        let store: SharedStore = Arc::new(PgStore::new(pool));
        let queue = JobQueue::new(QueueConfig::from_app_config(config));
        let pipeline = Arc::new(Pipeline::from_app_config(
            config,
            Arc::clone(&store),
            queue.clone(),
        )?);
        queue.start(pipeline.clone())?;
        Ok(Self {
            store,
            queue,
            pipeline,
        })
    }

    async fn drain(&self) -> anyhow::Result<()> {
        tokio::time::timeout(DRAIN_TIMEOUT, self.queue.wait_idle())
            .await
            .map_err(|_| anyhow::anyhow!("job queue did not drain within {DRAIN_TIMEOUT:?}"))?;

        let failed: Vec<_> = self
            .queue
            .records()
            .into_iter()
            .filter(|r| r.state == scoreline_jobs::JobState::Failed)
            .collect();
        for record in &failed {
            tracing::warn!(
                job_id = %record.id,
                kind = %record.kind,
                reason = record.failed_reason.as_deref().unwrap_or(""),
                "job failed"
            );
        }
        println!(
            "drained {} job(s), {} failed",
            self.queue.records().len(),
            failed.len()
        );
        Ok(())
    }
}

/// Runs both scheduler ticks once, then drains the queue.
///
/// # Errors
///
/// Returns an error if either tick cannot list its due records or the queue
/// fails to drain in time.
pub(crate) async fn run_tick(runtime: &Runtime) -> anyhow::Result<()> {
    let now = Utc::now();
    let sources = tick_sources(runtime.store.as_ref(), &runtime.queue, now).await?;
    let queries = tick_queries(runtime.store.as_ref(), &runtime.queue, now).await?;
    println!(
        "sources: {} due, {} queued, {} already active; queries: {} due, {} queued, {} already active",
        sources.due,
        sources.enqueued,
        sources.skipped_active,
        queries.due,
        queries.enqueued,
        queries.skipped_active
    );
    runtime.drain().await
}

/// Queues a manual fetch and waits for the resulting stages.
///
/// # Errors
///
/// Returns an error if the source is unknown or paused, or its fetch run
/// does not end `SUCCEEDED`.
pub(crate) async fn run_fetch(runtime: &Runtime, source_id: Uuid) -> anyhow::Result<()> {
    let outcome = trigger_source_fetch(
        runtime.store.as_ref(),
        &runtime.queue,
        source_id,
        TRIGGER_MANUAL,
    )
    .await?;

    let TriggerOutcome::Queued { run_id, .. } = outcome else {
        println!("source {source_id} already has an active fetch run; nothing queued");
        return Ok(());
    };

    runtime.drain().await?;

    let run = runtime
        .store
        .get_fetch_run(run_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("fetch run {run_id} disappeared"))?;
    println!("{}", serde_json::to_string_pretty(&run)?);
    if run.status != scoreline_core::RunStatus::Succeeded {
        anyhow::bail!(
            "fetch run {run_id} ended {}: {}",
            run.status,
            run.error_message.as_deref().unwrap_or("no error recorded")
        );
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the merge fails part-way; earlier groups stay merged.
pub(crate) async fn run_merge(
    runtime: &Runtime,
    org_id: Uuid,
    dry_run: bool,
) -> anyhow::Result<()> {
    let report = runtime
        .pipeline
        .dedup()
        .merge_duplicates(org_id, dry_run, Utc::now())
        .await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Scores one item now and waits for any clip pairing it triggers.
///
/// # Errors
///
/// Returns an error if the item is unknown to the org or scoring fails.
pub(crate) async fn run_rescore(
    runtime: &Runtime,
    news_item_id: Uuid,
    org_id: Uuid,
) -> anyhow::Result<()> {
    let score = runtime.pipeline.score_item(news_item_id, org_id).await?;
    println!("score {}: {}", score.total_score, score.reasoning);
    runtime.drain().await
}
