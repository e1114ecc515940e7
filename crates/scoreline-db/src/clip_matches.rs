//! Database operations for `clip_matches`.

use chrono::{DateTime, Utc};
use scoreline_core::{ClipMatch, ClipMatchStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const CLIP_MATCH_COLUMNS: &str =
    "id, news_item_id, candidate_id, match_score, match_reason, status, created_at, updated_at";

/// A row from the `clip_matches` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClipMatchRow {
    pub id: Uuid,
    pub news_item_id: Uuid,
    pub candidate_id: Uuid,
    pub match_score: f64,
    pub match_reason: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClipMatchRow {
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] if the stored status is unknown.
    pub fn into_clip_match(self) -> Result<ClipMatch, DbError> {
        Ok(ClipMatch {
            id: self.id,
            news_item_id: self.news_item_id,
            candidate_id: self.candidate_id,
            match_score: self.match_score,
            match_reason: self.match_reason,
            status: self.status.parse()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Inserts a `PENDING` match, or refreshes score and reason on an existing
/// `(news_item_id, candidate_id)` pair without touching its status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn upsert_clip_match(
    pool: &PgPool,
    news_item_id: Uuid,
    candidate_id: Uuid,
    match_score: f64,
    match_reason: &str,
) -> Result<ClipMatch, DbError> {
    let sql = format!(
        "INSERT INTO clip_matches (id, news_item_id, candidate_id, match_score, match_reason, status) \
         VALUES ($1, $2, $3, $4, $5, 'PENDING') \
         ON CONFLICT ON CONSTRAINT clip_matches_natural_key DO UPDATE SET \
             match_score = EXCLUDED.match_score, \
             match_reason = EXCLUDED.match_reason, \
             updated_at = NOW() \
         RETURNING {CLIP_MATCH_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ClipMatchRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(news_item_id)
        .bind(candidate_id)
        .bind(match_score)
        .bind(match_reason)
        .fetch_one(pool)
        .await?;

    row.into_clip_match()
}

/// Matches for one item, best first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_clip_matches(
    pool: &PgPool,
    news_item_id: Uuid,
) -> Result<Vec<ClipMatch>, DbError> {
    let sql = format!(
        "SELECT {CLIP_MATCH_COLUMNS} FROM clip_matches \
         WHERE news_item_id = $1 \
         ORDER BY match_score DESC, created_at ASC"
    );
    let rows = sqlx::query_as::<_, ClipMatchRow>(&sql)
        .bind(news_item_id)
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(ClipMatchRow::into_clip_match).collect()
}

/// Records an editorial decision on a match.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the match does not exist.
pub async fn set_clip_match_status(
    pool: &PgPool,
    id: Uuid,
    status: ClipMatchStatus,
) -> Result<(), DbError> {
    let result =
        sqlx::query("UPDATE clip_matches SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
