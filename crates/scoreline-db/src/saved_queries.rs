//! Database operations for `saved_queries` and `query_runs`.

use chrono::{DateTime, Utc};
use scoreline_core::{NewsType, QueryRun, SavedQuery, ScheduleType, Sport};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const QUERY_COLUMNS: &str = "id, org_id, name, sport, news_types, min_score, lookback_hours, \
     schedule_type, refresh_interval_minutes, cron_expression, enabled, last_run_at, next_run_at, \
     created_at";

const QUERY_RUN_COLUMNS: &str = "id, query_id, org_id, status, triggered_by, result_count, \
     item_ids, error_message, created_at, started_at, finished_at";

/// A row from the `saved_queries` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SavedQueryRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub sport: Option<String>,
    pub news_types: Vec<String>,
    pub min_score: Option<i32>,
    pub lookback_hours: i32,
    pub schedule_type: String,
    pub refresh_interval_minutes: i32,
    pub cron_expression: Option<String>,
    pub enabled: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SavedQueryRow {
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] if a stored enum value is unknown.
    pub fn into_saved_query(self) -> Result<SavedQuery, DbError> {
        let news_types = self
            .news_types
            .iter()
            .map(|t| t.parse::<NewsType>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SavedQuery {
            id: self.id,
            org_id: self.org_id,
            name: self.name,
            sport: self.sport.map(|s| s.parse()).transpose()?,
            news_types,
            min_score: self.min_score,
            lookback_hours: self.lookback_hours,
            schedule_type: self.schedule_type.parse()?,
            refresh_interval_minutes: self.refresh_interval_minutes,
            cron_expression: self.cron_expression,
            enabled: self.enabled,
            last_run_at: self.last_run_at,
            next_run_at: self.next_run_at,
            created_at: self.created_at,
        })
    }
}

/// A row from the `query_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueryRunRow {
    pub id: Uuid,
    pub query_id: Uuid,
    pub org_id: Uuid,
    pub status: String,
    pub triggered_by: String,
    pub result_count: i32,
    pub item_ids: Vec<Uuid>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl QueryRunRow {
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] if the stored status is unknown.
    pub fn into_query_run(self) -> Result<QueryRun, DbError> {
        Ok(QueryRun {
            id: self.id,
            query_id: self.query_id,
            org_id: self.org_id,
            status: self.status.parse()?,
            triggered_by: self.triggered_by,
            result_count: self.result_count,
            item_ids: self.item_ids,
            error_message: self.error_message,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
        })
    }
}

/// Fields needed to register a saved query.
#[derive(Debug, Clone)]
pub struct NewSavedQuery {
    pub org_id: Uuid,
    pub name: String,
    pub sport: Option<Sport>,
    pub news_types: Vec<NewsType>,
    pub min_score: Option<i32>,
    pub lookback_hours: i32,
    pub schedule_type: ScheduleType,
    pub refresh_interval_minutes: i32,
    pub cron_expression: Option<String>,
    pub enabled: bool,
}

impl NewSavedQuery {
    /// An enabled daily query over the last 24 hours with no filters.
    #[must_use]
    pub fn new(org_id: Uuid, name: &str) -> Self {
        Self {
            org_id,
            name: name.to_string(),
            sport: None,
            news_types: Vec::new(),
            min_score: None,
            lookback_hours: 24,
            schedule_type: ScheduleType::Daily,
            refresh_interval_minutes: 60,
            cron_expression: None,
            enabled: true,
        }
    }
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_saved_query(
    pool: &PgPool,
    new: &NewSavedQuery,
) -> Result<SavedQuery, DbError> {
    let types: Vec<&str> = new.news_types.iter().map(NewsType::as_str).collect();
    let sql = format!(
        "INSERT INTO saved_queries (id, org_id, name, sport, news_types, min_score, lookback_hours, \
                                    schedule_type, refresh_interval_minutes, cron_expression, enabled) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING {QUERY_COLUMNS}"
    );
    let row = sqlx::query_as::<_, SavedQueryRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(new.org_id)
        .bind(&new.name)
        .bind(new.sport.map(|s| s.as_str()))
        .bind(&types)
        .bind(new.min_score)
        .bind(new.lookback_hours)
        .bind(new.schedule_type.as_str())
        .bind(new.refresh_interval_minutes)
        .bind(&new.cron_expression)
        .bind(new.enabled)
        .fetch_one(pool)
        .await?;

    row.into_saved_query()
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_saved_query(pool: &PgPool, id: Uuid) -> Result<Option<SavedQuery>, DbError> {
    let sql = format!("SELECT {QUERY_COLUMNS} FROM saved_queries WHERE id = $1");
    sqlx::query_as::<_, SavedQueryRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(SavedQueryRow::into_saved_query)
        .transpose()
}

/// Enabled, non-manual queries whose next run is due or was never scheduled.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_due_queries(
    pool: &PgPool,
    now: DateTime<Utc>,
) -> Result<Vec<SavedQuery>, DbError> {
    let sql = format!(
        "SELECT {QUERY_COLUMNS} FROM saved_queries \
         WHERE enabled AND schedule_type <> 'MANUAL' \
           AND (next_run_at IS NULL OR next_run_at <= $1) \
         ORDER BY next_run_at ASC NULLS FIRST, created_at ASC"
    );
    let rows = sqlx::query_as::<_, SavedQueryRow>(&sql)
        .bind(now)
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(SavedQueryRow::into_saved_query).collect()
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the query does not exist.
pub async fn set_query_schedule(
    pool: &PgPool,
    id: Uuid,
    last_run_at: DateTime<Utc>,
    next_run_at: Option<DateTime<Utc>>,
) -> Result<(), DbError> {
    let result =
        sqlx::query("UPDATE saved_queries SET last_run_at = $2, next_run_at = $3 WHERE id = $1")
            .bind(id)
            .bind(last_run_at)
            .bind(next_run_at)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Creates a `QUEUED` run unless the query already has a queued or running one.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails for any other reason.
pub async fn create_query_run_if_idle(
    pool: &PgPool,
    query: &SavedQuery,
    triggered_by: &str,
) -> Result<Option<QueryRun>, DbError> {
    let sql = format!(
        "INSERT INTO query_runs (id, query_id, org_id, status, triggered_by) \
         VALUES ($1, $2, $3, 'QUEUED', $4) \
         ON CONFLICT (query_id) WHERE status IN ('QUEUED', 'RUNNING') DO NOTHING \
         RETURNING {QUERY_RUN_COLUMNS}"
    );
    sqlx::query_as::<_, QueryRunRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(query.id)
        .bind(query.org_id)
        .bind(triggered_by)
        .fetch_optional(pool)
        .await?
        .map(QueryRunRow::into_query_run)
        .transpose()
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_query_run(pool: &PgPool, id: Uuid) -> Result<Option<QueryRun>, DbError> {
    let sql = format!("SELECT {QUERY_RUN_COLUMNS} FROM query_runs WHERE id = $1");
    sqlx::query_as::<_, QueryRunRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(QueryRunRow::into_query_run)
        .transpose()
}

/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the run is not queued.
pub async fn start_query_run(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE query_runs \
         SET status = 'RUNNING', started_at = COALESCE(started_at, NOW()) \
         WHERE id = $1 AND status = 'QUEUED'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidTransition {
            entity: "query run",
            id,
            expected: "QUEUED",
        });
    }
    Ok(())
}

/// Marks a run `SUCCEEDED` and records the matched item ids.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the run is not running.
pub async fn complete_query_run(
    pool: &PgPool,
    id: Uuid,
    item_ids: &[Uuid],
) -> Result<(), DbError> {
    let result_count = i32::try_from(item_ids.len()).unwrap_or(i32::MAX);
    let result = sqlx::query(
        "UPDATE query_runs \
         SET status = 'SUCCEEDED', finished_at = NOW(), result_count = $2, item_ids = $3 \
         WHERE id = $1 AND status = 'RUNNING'",
    )
    .bind(id)
    .bind(result_count)
    .bind(item_ids)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidTransition {
            entity: "query run",
            id,
            expected: "RUNNING",
        });
    }
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the run already finished.
pub async fn fail_query_run(pool: &PgPool, id: Uuid, message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE query_runs \
         SET status = 'FAILED', finished_at = NOW(), error_message = $2 \
         WHERE id = $1 AND status IN ('QUEUED', 'RUNNING')",
    )
    .bind(id)
    .bind(message)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidTransition {
            entity: "query run",
            id,
            expected: "QUEUED or RUNNING",
        });
    }
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn fail_stale_query_runs(
    pool: &PgPool,
    older_than: DateTime<Utc>,
    message: &str,
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE query_runs \
         SET status = 'FAILED', finished_at = NOW(), error_message = $2 \
         WHERE status IN ('QUEUED', 'RUNNING') AND created_at < $1",
    )
    .bind(older_than)
    .bind(message)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
