//! Database operations for `sources` and `source_fetch_runs`.

use chrono::{DateTime, Utc};
use scoreline_core::{ScheduleType, Source, SourceFetchRun, SourceStatus, Sport};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const SOURCE_COLUMNS: &str = "id, org_id, name, adapter_type, sport, config, schedule_type, \
     refresh_interval_minutes, cron_expression, status, last_fetch_at, next_fetch_at, \
     last_success_at, last_error_at, last_error_message, error_count, consecutive_errors, \
     created_at, updated_at";

const FETCH_RUN_COLUMNS: &str = "id, source_id, org_id, status, triggered_by, items_fetched, \
     items_new, items_duplicate, error_message, created_at, started_at, finished_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `sources` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SourceRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub adapter_type: String,
    pub sport: String,
    pub config: serde_json::Value,
    pub schedule_type: String,
    pub refresh_interval_minutes: i32,
    pub cron_expression: Option<String>,
    pub status: String,
    pub last_fetch_at: Option<DateTime<Utc>>,
    pub next_fetch_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_error_message: Option<String>,
    pub error_count: i32,
    pub consecutive_errors: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SourceRow {
    /// Decode the text enum columns.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] if a stored enum value is unknown.
    pub fn into_source(self) -> Result<Source, DbError> {
        Ok(Source {
            id: self.id,
            org_id: self.org_id,
            name: self.name,
            adapter_type: self.adapter_type,
            sport: self.sport.parse()?,
            config: self.config,
            schedule_type: self.schedule_type.parse()?,
            refresh_interval_minutes: self.refresh_interval_minutes,
            cron_expression: self.cron_expression,
            status: self.status.parse()?,
            last_fetch_at: self.last_fetch_at,
            next_fetch_at: self.next_fetch_at,
            last_success_at: self.last_success_at,
            last_error_at: self.last_error_at,
            last_error_message: self.last_error_message,
            error_count: self.error_count,
            consecutive_errors: self.consecutive_errors,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// A row from the `source_fetch_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FetchRunRow {
    pub id: Uuid,
    pub source_id: Uuid,
    pub org_id: Uuid,
    pub status: String,
    pub triggered_by: String,
    pub items_fetched: i32,
    pub items_new: i32,
    pub items_duplicate: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl FetchRunRow {
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] if the stored status is unknown.
    pub fn into_fetch_run(self) -> Result<SourceFetchRun, DbError> {
        Ok(SourceFetchRun {
            id: self.id,
            source_id: self.source_id,
            org_id: self.org_id,
            status: self.status.parse()?,
            triggered_by: self.triggered_by,
            items_fetched: self.items_fetched,
            items_new: self.items_new,
            items_duplicate: self.items_duplicate,
            error_message: self.error_message,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Fields needed to register a source.
#[derive(Debug, Clone)]
pub struct NewSource {
    pub org_id: Uuid,
    pub name: String,
    pub adapter_type: String,
    pub sport: Sport,
    pub config: serde_json::Value,
    pub schedule_type: ScheduleType,
    pub refresh_interval_minutes: i32,
    pub cron_expression: Option<String>,
    pub status: SourceStatus,
    pub next_fetch_at: Option<DateTime<Utc>>,
}

impl NewSource {
    /// An active hourly source with an empty config.
    #[must_use]
    pub fn new(org_id: Uuid, name: &str, adapter_type: &str, sport: Sport) -> Self {
        Self {
            org_id,
            name: name.to_string(),
            adapter_type: adapter_type.to_string(),
            sport,
            config: serde_json::json!({}),
            schedule_type: ScheduleType::Hourly,
            refresh_interval_minutes: 60,
            cron_expression: None,
            status: SourceStatus::Active,
            next_fetch_at: None,
        }
    }
}

/// Item counters recorded when a fetch run succeeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchCounts {
    pub items_fetched: i32,
    pub items_new: i32,
    pub items_duplicate: i32,
}

// ---------------------------------------------------------------------------
// sources operations
// ---------------------------------------------------------------------------

/// Inserts a source and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_source(pool: &PgPool, new: &NewSource) -> Result<Source, DbError> {
    let sql = format!(
        "INSERT INTO sources (id, org_id, name, adapter_type, sport, config, schedule_type, \
                              refresh_interval_minutes, cron_expression, status, next_fetch_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING {SOURCE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, SourceRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(new.org_id)
        .bind(&new.name)
        .bind(&new.adapter_type)
        .bind(new.sport.as_str())
        .bind(&new.config)
        .bind(new.schedule_type.as_str())
        .bind(new.refresh_interval_minutes)
        .bind(&new.cron_expression)
        .bind(new.status.as_str())
        .bind(new.next_fetch_at)
        .fetch_one(pool)
        .await?;

    row.into_source()
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_source(pool: &PgPool, id: Uuid) -> Result<Option<Source>, DbError> {
    let sql = format!("SELECT {SOURCE_COLUMNS} FROM sources WHERE id = $1");
    sqlx::query_as::<_, SourceRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(SourceRow::into_source)
        .transpose()
}

/// Active, non-manual sources whose next fetch is due or was never scheduled.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_due_sources(pool: &PgPool, now: DateTime<Utc>) -> Result<Vec<Source>, DbError> {
    let sql = format!(
        "SELECT {SOURCE_COLUMNS} FROM sources \
         WHERE status = 'ACTIVE' AND schedule_type <> 'MANUAL' \
           AND (next_fetch_at IS NULL OR next_fetch_at <= $1) \
         ORDER BY next_fetch_at ASC NULLS FIRST, created_at ASC"
    );
    let rows = sqlx::query_as::<_, SourceRow>(&sql)
        .bind(now)
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(SourceRow::into_source).collect()
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the source does not exist.
pub async fn set_source_next_fetch(
    pool: &PgPool,
    id: Uuid,
    next_fetch_at: Option<DateTime<Utc>>,
) -> Result<(), DbError> {
    let result =
        sqlx::query("UPDATE sources SET next_fetch_at = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(next_fetch_at)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Stamps a successful fetch and resets the consecutive error counter.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the source does not exist.
pub async fn record_source_success(
    pool: &PgPool,
    id: Uuid,
    at: DateTime<Utc>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sources \
         SET last_fetch_at = $2, last_success_at = $2, consecutive_errors = 0, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Records a failed fetch attempt on the source.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the source does not exist.
pub async fn record_source_failure(
    pool: &PgPool,
    id: Uuid,
    at: DateTime<Utc>,
    message: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sources \
         SET last_fetch_at = $2, last_error_at = $2, last_error_message = $3, \
             error_count = error_count + 1, consecutive_errors = consecutive_errors + 1, \
             updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(at)
    .bind(message)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// source_fetch_runs operations
// ---------------------------------------------------------------------------

/// Creates a `QUEUED` run unless the source already has a queued or running one.
///
/// The partial unique index `source_fetch_runs_one_active_idx` makes the
/// check and the insert a single atomic statement. Returns `None` when the
/// source is busy.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails for any other reason.
pub async fn create_fetch_run_if_idle(
    pool: &PgPool,
    source: &Source,
    triggered_by: &str,
) -> Result<Option<SourceFetchRun>, DbError> {
    let sql = format!(
        "INSERT INTO source_fetch_runs (id, source_id, org_id, status, triggered_by) \
         VALUES ($1, $2, $3, 'QUEUED', $4) \
         ON CONFLICT (source_id) WHERE status IN ('QUEUED', 'RUNNING') DO NOTHING \
         RETURNING {FETCH_RUN_COLUMNS}"
    );
    sqlx::query_as::<_, FetchRunRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(source.id)
        .bind(source.org_id)
        .bind(triggered_by)
        .fetch_optional(pool)
        .await?
        .map(FetchRunRow::into_fetch_run)
        .transpose()
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_fetch_run(pool: &PgPool, id: Uuid) -> Result<Option<SourceFetchRun>, DbError> {
    let sql = format!("SELECT {FETCH_RUN_COLUMNS} FROM source_fetch_runs WHERE id = $1");
    sqlx::query_as::<_, FetchRunRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(FetchRunRow::into_fetch_run)
        .transpose()
}

/// Moves a run from `QUEUED` to `RUNNING`. `started_at` keeps the first attempt's time.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the run is not queued.
pub async fn start_fetch_run(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE source_fetch_runs \
         SET status = 'RUNNING', started_at = COALESCE(started_at, NOW()) \
         WHERE id = $1 AND status = 'QUEUED'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidTransition {
            entity: "fetch run",
            id,
            expected: "QUEUED",
        });
    }
    Ok(())
}

/// Returns a `RUNNING` run to `QUEUED` ahead of a retry, keeping the overlap
/// guard engaged.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the run is not running.
pub async fn requeue_fetch_run(pool: &PgPool, id: Uuid, message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE source_fetch_runs \
         SET status = 'QUEUED', error_message = $2 \
         WHERE id = $1 AND status = 'RUNNING'",
    )
    .bind(id)
    .bind(message)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidTransition {
            entity: "fetch run",
            id,
            expected: "RUNNING",
        });
    }
    Ok(())
}

/// Marks a run `SUCCEEDED` with its item counters.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the run is not running.
pub async fn complete_fetch_run(
    pool: &PgPool,
    id: Uuid,
    counts: FetchCounts,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE source_fetch_runs \
         SET status = 'SUCCEEDED', finished_at = NOW(), error_message = NULL, \
             items_fetched = $2, items_new = $3, items_duplicate = $4 \
         WHERE id = $1 AND status = 'RUNNING'",
    )
    .bind(id)
    .bind(counts.items_fetched)
    .bind(counts.items_new)
    .bind(counts.items_duplicate)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidTransition {
            entity: "fetch run",
            id,
            expected: "RUNNING",
        });
    }
    Ok(())
}

/// Marks a queued or running run `FAILED`.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the run already finished.
pub async fn fail_fetch_run(pool: &PgPool, id: Uuid, message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE source_fetch_runs \
         SET status = 'FAILED', finished_at = NOW(), error_message = $2 \
         WHERE id = $1 AND status IN ('QUEUED', 'RUNNING')",
    )
    .bind(id)
    .bind(message)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidTransition {
            entity: "fetch run",
            id,
            expected: "QUEUED or RUNNING",
        });
    }
    Ok(())
}

/// Most recent runs for a source, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_fetch_runs(
    pool: &PgPool,
    source_id: Uuid,
    limit: i64,
) -> Result<Vec<SourceFetchRun>, DbError> {
    let sql = format!(
        "SELECT {FETCH_RUN_COLUMNS} FROM source_fetch_runs \
         WHERE source_id = $1 \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2"
    );
    let rows = sqlx::query_as::<_, FetchRunRow>(&sql)
        .bind(source_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(FetchRunRow::into_fetch_run).collect()
}

/// Fails queued or running runs created before `older_than`. Returns the
/// number of runs affected.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn fail_stale_fetch_runs(
    pool: &PgPool,
    older_than: DateTime<Utc>,
    message: &str,
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE source_fetch_runs \
         SET status = 'FAILED', finished_at = NOW(), error_message = $2 \
         WHERE status IN ('QUEUED', 'RUNNING') AND created_at < $1",
    )
    .bind(older_than)
    .bind(message)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
