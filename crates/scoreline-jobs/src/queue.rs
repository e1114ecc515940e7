//! Job registry, per-kind worker pools, and the retry loop.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use scoreline_core::AppConfig;
use serde::Serialize;
use tokio::sync::{mpsc, Notify, Semaphore};
use uuid::Uuid;

use crate::error::{JobError, QueueError};
use crate::payload::{JobKind, JobPayload};
use crate::retry::backoff_delay;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_BASE_SECS: u64 = 5;
const DEFAULT_CONCURRENCY: usize = 5;
const DEFAULT_FETCH_CONCURRENCY: usize = 2;
const SUCCEEDED_RETENTION_HOURS: i64 = 24;
const SUCCEEDED_MAX: usize = 1000;
const FAILED_RETENTION_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Queued,
    Running,
    /// Waiting out a backoff before the next attempt.
    Delayed,
    Succeeded,
    Failed,
}

impl JobState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// Bookkeeping for one enqueued job.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub kind: JobKind,
    pub payload: JobPayload,
    pub state: JobState,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub failed_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub run_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub max_attempts: u32,
    pub backoff_base: Duration,
    /// Worker pool size for kinds without an explicit entry in `concurrency`.
    pub default_concurrency: usize,
    pub concurrency: HashMap<JobKind, usize>,
    pub succeeded_retention: chrono::Duration,
    pub succeeded_max: usize,
    pub failed_retention: chrono::Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: Duration::from_secs(DEFAULT_BACKOFF_BASE_SECS),
            default_concurrency: DEFAULT_CONCURRENCY,
            concurrency: HashMap::from([(JobKind::SourceFetch, DEFAULT_FETCH_CONCURRENCY)]),
            succeeded_retention: chrono::Duration::hours(SUCCEEDED_RETENTION_HOURS),
            succeeded_max: SUCCEEDED_MAX,
            failed_retention: chrono::Duration::days(FAILED_RETENTION_DAYS),
        }
    }
}

impl QueueConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.job_max_attempts,
            backoff_base: Duration::from_secs(config.job_backoff_base_secs),
            default_concurrency: config.worker_concurrency,
            concurrency: HashMap::from([(JobKind::SourceFetch, config.fetch_concurrency)]),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn concurrency_for(&self, kind: JobKind) -> usize {
        self.concurrency
            .get(&kind)
            .copied()
            .unwrap_or(self.default_concurrency)
            .max(1)
    }
}

/// What a handler knows about the attempt it is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobContext {
    pub job_id: Uuid,
    pub kind: JobKind,
    /// 1-based.
    pub attempt: u32,
    pub max_attempts: u32,
}

impl JobContext {
    /// `true` when a retryable failure of this attempt will not be retried.
    #[must_use]
    pub fn is_final_attempt(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    /// # Errors
    ///
    /// [`JobError::Retryable`] reschedules the job while attempts remain;
    /// [`JobError::Fatal`] fails it immediately.
    async fn handle(&self, ctx: &JobContext, payload: &JobPayload) -> Result<(), JobError>;
}

type Receivers = HashMap<JobKind, mpsc::UnboundedReceiver<Uuid>>;

struct Inner {
    config: QueueConfig,
    records: Mutex<HashMap<Uuid, JobRecord>>,
    senders: HashMap<JobKind, mpsc::UnboundedSender<Uuid>>,
    receivers: Mutex<Option<Receivers>>,
    changed: Notify,
}

/// Cloneable handle to the queue. Jobs enqueued before [`JobQueue::start`]
/// are buffered and picked up once workers run.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<Inner>,
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue")
            .field("config", &self.inner.config)
            .field("jobs", &self.inner.records().len())
            .finish_non_exhaustive()
    }
}

impl JobQueue {
    #[must_use]
    pub fn new(config: QueueConfig) -> Self {
        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        for kind in JobKind::ALL {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.insert(kind, tx);
            receivers.insert(kind, rx);
        }

        Self {
            inner: Arc::new(Inner {
                config,
                records: Mutex::new(HashMap::new()),
                senders,
                receivers: Mutex::new(Some(receivers)),
                changed: Notify::new(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Spawns one dispatcher per job kind. Must be called inside a Tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::AlreadyStarted`] on a second call.
    pub fn start(&self, handler: Arc<dyn JobHandler>) -> Result<(), QueueError> {
        let receivers = self
            .inner
            .receivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(QueueError::AlreadyStarted)?;

        for (kind, rx) in receivers {
            let limit = self.inner.config.concurrency_for(kind);
            tracing::info!(kind = %kind, limit, "jobs: starting worker pool");
            tokio::spawn(dispatch(
                Arc::clone(&self.inner),
                kind,
                rx,
                Arc::clone(&handler),
            ));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] if the worker channel is gone.
    pub fn enqueue(&self, payload: JobPayload) -> Result<Uuid, QueueError> {
        let kind = payload.kind();
        let record = JobRecord {
            id: Uuid::new_v4(),
            kind,
            payload,
            state: JobState::Queued,
            attempts_made: 0,
            max_attempts: self.inner.config.max_attempts.max(1),
            failed_reason: None,
            created_at: Utc::now(),
            processed_at: None,
            finished_at: None,
            run_at: None,
        };
        let id = record.id;
        self.inner.records().insert(id, record);

        if self.inner.send(kind, id).is_err() {
            self.inner.records().remove(&id);
            return Err(QueueError::Closed);
        }
        tracing::debug!(job_id = %id, kind = %kind, "jobs: enqueued");
        self.inner.changed.notify_waiters();
        Ok(id)
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<JobRecord> {
        self.inner.records().get(&id).cloned()
    }

    /// Every retained job, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<JobRecord> {
        let mut records: Vec<JobRecord> = self.inner.records().values().cloned().collect();
        records.sort_by_key(|r| r.created_at);
        records
    }

    /// Waits until the job reaches a terminal state. `None` when the id is
    /// unknown or the record was pruned.
    pub async fn wait_for(&self, id: Uuid) -> Option<JobRecord> {
        loop {
            let notified = self.inner.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.get(id) {
                Some(record) if record.state.is_terminal() => return Some(record),
                Some(_) => {}
                None => return None,
            }
            notified.await;
        }
    }

    /// Waits until no job is queued, running, or delayed.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let busy = self
                .inner
                .records()
                .values()
                .any(|r| !r.state.is_terminal());
            if !busy {
                return;
            }
            notified.await;
        }
    }

    /// Drops finished records past their retention. Returns how many went.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        self.inner.prune(now)
    }
}

impl Inner {
    fn records(&self) -> MutexGuard<'_, HashMap<Uuid, JobRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, kind: JobKind, id: Uuid) -> Result<(), QueueError> {
        self.senders
            .get(&kind)
            .ok_or(QueueError::Closed)?
            .send(id)
            .map_err(|_| QueueError::Closed)
    }

    /// Moves a queued job to running and hands out its attempt context.
    fn begin(&self, id: Uuid) -> Option<(JobContext, JobPayload)> {
        let mut records = self.records();
        let record = records.get_mut(&id)?;
        if record.state != JobState::Queued {
            return None;
        }

        record.state = JobState::Running;
        record.attempts_made += 1;
        record.processed_at = Some(Utc::now());
        record.run_at = None;

        let ctx = JobContext {
            job_id: id,
            kind: record.kind,
            attempt: record.attempts_made,
            max_attempts: record.max_attempts,
        };
        Some((ctx, record.payload.clone()))
    }

    /// Records an attempt outcome. Returns the backoff to wait before
    /// requeueing, if the job gets another attempt.
    fn finish(&self, ctx: &JobContext, outcome: Result<(), JobError>) -> Option<Duration> {
        let now = Utc::now();
        let mut retry_after = None;
        {
            let mut records = self.records();
            let Some(record) = records.get_mut(&ctx.job_id) else {
                return None;
            };

            match outcome {
                Ok(()) => {
                    record.state = JobState::Succeeded;
                    record.finished_at = Some(now);
                    record.failed_reason = None;
                    tracing::debug!(job_id = %ctx.job_id, kind = %ctx.kind, "jobs: succeeded");
                }
                Err(err) if err.is_retryable() && !ctx.is_final_attempt() => {
                    let delay = backoff_delay(self.config.backoff_base, ctx.attempt);
                    record.state = JobState::Delayed;
                    record.failed_reason = Some(err.message().to_string());
                    record.run_at = chrono::Duration::from_std(delay)
                        .ok()
                        .map(|d| now + d);
                    tracing::warn!(
                        job_id = %ctx.job_id,
                        kind = %ctx.kind,
                        attempt = ctx.attempt,
                        max_attempts = ctx.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "jobs: attempt failed, retrying after backoff"
                    );
                    retry_after = Some(delay);
                }
                Err(err) => {
                    record.state = JobState::Failed;
                    record.finished_at = Some(now);
                    record.failed_reason = Some(err.message().to_string());
                    tracing::error!(
                        job_id = %ctx.job_id,
                        kind = %ctx.kind,
                        attempt = ctx.attempt,
                        error = %err,
                        "jobs: failed"
                    );
                }
            }
        }

        self.prune(now);
        self.changed.notify_waiters();
        retry_after
    }

    fn requeue(&self, id: Uuid) {
        let kind = {
            let mut records = self.records();
            let Some(record) = records.get_mut(&id) else {
                return;
            };
            if record.state != JobState::Delayed {
                return;
            }
            record.state = JobState::Queued;
            record.kind
        };

        if self.send(kind, id).is_err() {
            if let Some(record) = self.records().get_mut(&id) {
                record.state = JobState::Failed;
                record.finished_at = Some(Utc::now());
                record.failed_reason = Some("job queue closed".to_string());
            }
        }
        self.changed.notify_waiters();
    }

    fn prune(&self, now: DateTime<Utc>) -> usize {
        let config = &self.config;
        let mut records = self.records();
        let before = records.len();

        records.retain(|_, r| {
            let age = r.finished_at.map(|finished| now - finished);
            match r.state {
                JobState::Succeeded => age.is_none_or(|age| age <= config.succeeded_retention),
                JobState::Failed => age.is_none_or(|age| age <= config.failed_retention),
                _ => true,
            }
        });

        let mut succeeded: Vec<(DateTime<Utc>, Uuid)> = records
            .values()
            .filter(|r| r.state == JobState::Succeeded)
            .map(|r| (r.finished_at.unwrap_or(r.created_at), r.id))
            .collect();
        if succeeded.len() > config.succeeded_max {
            succeeded.sort();
            let excess = succeeded.len() - config.succeeded_max;
            for (_, id) in &succeeded[..excess] {
                records.remove(id);
            }
        }

        before - records.len()
    }
}

async fn dispatch(
    inner: Arc<Inner>,
    kind: JobKind,
    mut rx: mpsc::UnboundedReceiver<Uuid>,
    handler: Arc<dyn JobHandler>,
) {
    let permits = Arc::new(Semaphore::new(inner.config.concurrency_for(kind)));

    while let Some(job_id) = rx.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let inner = Arc::clone(&inner);
        let handler = Arc::clone(&handler);

        tokio::spawn(async move {
            if let Some(delay) = run_attempt(&inner, handler.as_ref(), job_id).await {
                drop(permit);
                tokio::time::sleep(delay).await;
                inner.requeue(job_id);
            }
        });
    }
}

/// Runs one attempt. A panicking handler counts as a retryable failure.
async fn run_attempt(inner: &Inner, handler: &dyn JobHandler, job_id: Uuid) -> Option<Duration> {
    let (ctx, payload) = inner.begin(job_id)?;

    let outcome = AssertUnwindSafe(handler.handle(&ctx, &payload))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(JobError::Retryable(panic_message(panic.as_ref()))));

    inner.finish(&ctx, outcome)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("handler panicked: {message}")
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod tests;
