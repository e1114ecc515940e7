//! Periodic and manual triggers that turn due sources and saved queries
//! into queued runs and jobs.
//!
//! Each trigger creates the run through the store's atomic "create if idle"
//! operation, so a source or query never has two active runs. The run is
//! committed before its job is enqueued.

use chrono::{DateTime, Utc};
use scoreline_core::{SavedQuery, Source, SourceStatus};
use scoreline_db::Store;
use scoreline_jobs::{JobPayload, JobQueue};
use serde::Serialize;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::schedule::compute_next_run;

pub const TRIGGER_CRON: &str = "cron";
pub const TRIGGER_MANUAL: &str = "manual";

/// Outcome of one scheduler tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    pub due: usize,
    pub enqueued: usize,
    /// Due records skipped because a run was already queued or running.
    pub skipped_active: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TriggerOutcome {
    Queued { run_id: Uuid, job_id: Uuid },
    AlreadyRunning,
}

/// Queues a fetch for every due source and advances its schedule.
///
/// A source whose run is still active is left untouched and stays due for
/// the next tick. Errors on one source are logged and counted; the tick
/// carries on with the rest.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] if the due sources cannot be listed.
pub async fn tick_sources(
    store: &dyn Store,
    queue: &JobQueue,
    now: DateTime<Utc>,
) -> Result<TickReport, PipelineError> {
    let due = store.list_due_sources(now).await?;
    let mut report = TickReport {
        due: due.len(),
        ..TickReport::default()
    };

    for source in &due {
        match enqueue_source_fetch(store, queue, source, TRIGGER_CRON).await {
            Ok(TriggerOutcome::Queued { .. }) => {
                let next = compute_next_run(
                    source.schedule_type,
                    source.refresh_interval_minutes,
                    source.cron_expression.as_deref(),
                    now,
                );
                if let Err(e) = store.set_source_next_fetch(source.id, next).await {
                    tracing::error!(source_id = %source.id, error = %e, "scheduler: failed to advance source schedule");
                }
                report.enqueued += 1;
            }
            Ok(TriggerOutcome::AlreadyRunning) => {
                tracing::debug!(source_id = %source.id, "scheduler: source fetch already active, skipping");
                report.skipped_active += 1;
            }
            Err(e) => {
                tracing::error!(source_id = %source.id, error = %e, "scheduler: failed to queue source fetch");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        due = report.due,
        enqueued = report.enqueued,
        skipped_active = report.skipped_active,
        failed = report.failed,
        "scheduler: source tick complete"
    );
    Ok(report)
}

/// Queues a run for every due saved query and advances its schedule.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] if the due queries cannot be listed.
pub async fn tick_queries(
    store: &dyn Store,
    queue: &JobQueue,
    now: DateTime<Utc>,
) -> Result<TickReport, PipelineError> {
    let due = store.list_due_queries(now).await?;
    let mut report = TickReport {
        due: due.len(),
        ..TickReport::default()
    };

    for query in &due {
        match enqueue_saved_query(store, queue, query, TRIGGER_CRON).await {
            Ok(TriggerOutcome::Queued { .. }) => {
                let next = compute_next_run(
                    query.schedule_type,
                    query.refresh_interval_minutes,
                    query.cron_expression.as_deref(),
                    now,
                );
                if let Err(e) = store.set_query_schedule(query.id, now, next).await {
                    tracing::error!(query_id = %query.id, error = %e, "scheduler: failed to advance query schedule");
                }
                report.enqueued += 1;
            }
            Ok(TriggerOutcome::AlreadyRunning) => {
                tracing::debug!(query_id = %query.id, "scheduler: query run already active, skipping");
                report.skipped_active += 1;
            }
            Err(e) => {
                tracing::error!(query_id = %query.id, error = %e, "scheduler: failed to queue saved query");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        due = report.due,
        enqueued = report.enqueued,
        skipped_active = report.skipped_active,
        failed = report.failed,
        "scheduler: query tick complete"
    );
    Ok(report)
}

/// Manually queues a fetch for one source. The source's schedule is not
/// changed.
///
/// # Errors
///
/// Returns [`PipelineError::SourceNotFound`] or [`PipelineError::SourcePaused`]
/// for sources that cannot be fetched, and store or queue errors otherwise.
pub async fn trigger_source_fetch(
    store: &dyn Store,
    queue: &JobQueue,
    source_id: Uuid,
    triggered_by: &str,
) -> Result<TriggerOutcome, PipelineError> {
    let source = store
        .get_source(source_id)
        .await?
        .ok_or(PipelineError::SourceNotFound(source_id))?;
    if source.status == SourceStatus::Paused {
        return Err(PipelineError::SourcePaused(source_id));
    }
    enqueue_source_fetch(store, queue, &source, triggered_by).await
}

/// Manually queues a run of one saved query, enabled or not.
///
/// # Errors
///
/// Returns [`PipelineError::QueryNotFound`] for unknown queries, and store
/// or queue errors otherwise.
pub async fn trigger_saved_query(
    store: &dyn Store,
    queue: &JobQueue,
    query_id: Uuid,
    triggered_by: &str,
) -> Result<TriggerOutcome, PipelineError> {
    let query = store
        .get_saved_query(query_id)
        .await?
        .ok_or(PipelineError::QueryNotFound(query_id))?;
    enqueue_saved_query(store, queue, &query, triggered_by).await
}

async fn enqueue_source_fetch(
    store: &dyn Store,
    queue: &JobQueue,
    source: &Source,
    triggered_by: &str,
) -> Result<TriggerOutcome, PipelineError> {
    let Some(run) = store.create_fetch_run_if_idle(source, triggered_by).await? else {
        return Ok(TriggerOutcome::AlreadyRunning);
    };

    let payload = JobPayload::SourceFetch {
        source_id: source.id,
        fetch_run_id: run.id,
        org_id: source.org_id,
        triggered_by: triggered_by.to_string(),
    };
    match queue.enqueue(payload) {
        Ok(job_id) => {
            tracing::info!(source_id = %source.id, fetch_run_id = %run.id, %job_id, triggered_by, "scheduler: source fetch queued");
            Ok(TriggerOutcome::Queued {
                run_id: run.id,
                job_id,
            })
        }
        Err(e) => {
            // Release the overlap guard so the next tick can retry.
            store.fail_fetch_run(run.id, &e.to_string()).await?;
            Err(e.into())
        }
    }
}

async fn enqueue_saved_query(
    store: &dyn Store,
    queue: &JobQueue,
    query: &SavedQuery,
    triggered_by: &str,
) -> Result<TriggerOutcome, PipelineError> {
    let Some(run) = store.create_query_run_if_idle(query, triggered_by).await? else {
        return Ok(TriggerOutcome::AlreadyRunning);
    };

    let payload = JobPayload::ScheduledQuery {
        query_id: query.id,
        query_run_id: run.id,
        org_id: query.org_id,
    };
    match queue.enqueue(payload) {
        Ok(job_id) => {
            tracing::info!(query_id = %query.id, query_run_id = %run.id, %job_id, triggered_by, "scheduler: saved query queued");
            Ok(TriggerOutcome::Queued {
                run_id: run.id,
                job_id,
            })
        }
        Err(e) => {
            store.fail_query_run(run.id, &e.to_string()).await?;
            Err(e.into())
        }
    }
}
