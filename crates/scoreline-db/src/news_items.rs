//! Database operations for `news_items`, including duplicate merging.

use chrono::{DateTime, Utc};
use scoreline_core::{NewsItem, NewsType, ScoreBreakdown, Sport};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const NEWS_ITEM_COLUMNS: &str = "id, org_id, source_id, external_id, news_type, sport, headline, \
     content, url, author, published_at, teams, players, topics, content_fingerprint, \
     importance_score, score_breakdown, score_reasoning, scored_at, paired, created_at, updated_at";

/// A row from the `news_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NewsItemRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub source_id: Uuid,
    pub external_id: String,
    pub news_type: String,
    pub sport: String,
    pub headline: String,
    pub content: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    pub teams: Vec<String>,
    pub players: Vec<String>,
    pub topics: Vec<String>,
    pub content_fingerprint: String,
    pub importance_score: Option<i32>,
    pub score_breakdown: Option<Json<ScoreBreakdown>>,
    pub score_reasoning: Option<String>,
    pub scored_at: Option<DateTime<Utc>>,
    pub paired: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewsItemRow {
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] if a stored enum value is unknown.
    pub fn into_news_item(self) -> Result<NewsItem, DbError> {
        Ok(NewsItem {
            id: self.id,
            org_id: self.org_id,
            source_id: self.source_id,
            external_id: self.external_id,
            news_type: self.news_type.parse()?,
            sport: self.sport.parse()?,
            headline: self.headline,
            content: self.content,
            url: self.url,
            author: self.author,
            published_at: self.published_at,
            teams: self.teams,
            players: self.players,
            topics: self.topics,
            content_fingerprint: self.content_fingerprint,
            importance_score: self.importance_score,
            score_breakdown: self.score_breakdown.map(|Json(b)| b),
            score_reasoning: self.score_reasoning,
            scored_at: self.scored_at,
            paired: self.paired,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InsertedNewsItemRow {
    #[sqlx(flatten)]
    item: NewsItemRow,
    inserted: bool,
}

/// A deduplicated item ready to persist, with its extracted entities.
#[derive(Debug, Clone)]
pub struct NewNewsItem {
    pub org_id: Uuid,
    pub source_id: Uuid,
    pub external_id: String,
    pub news_type: NewsType,
    pub sport: Sport,
    pub headline: String,
    pub content: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    pub teams: Vec<String>,
    pub players: Vec<String>,
    pub topics: Vec<String>,
    pub content_fingerprint: String,
}

/// Output of the scorer, written back onto an item.
#[derive(Debug, Clone)]
pub struct ScoreUpdate {
    pub importance_score: i32,
    pub breakdown: ScoreBreakdown,
    pub reasoning: String,
    pub scored_at: DateTime<Utc>,
}

/// Filter for saved-query style searches.
#[derive(Debug, Clone)]
pub struct NewsSearch {
    pub org_id: Uuid,
    pub sport: Option<Sport>,
    pub news_types: Vec<NewsType>,
    pub min_score: Option<i32>,
    pub published_since: DateTime<Utc>,
    pub limit: i64,
}

/// What merging one duplicate group changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub items_deleted: u64,
    pub clips_reassigned: u64,
    pub clips_dropped: u64,
}

/// Point lookup on the `(org_id, source_id, external_id)` natural key.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_news_item_by_external_id(
    pool: &PgPool,
    org_id: Uuid,
    source_id: Uuid,
    external_id: &str,
) -> Result<Option<NewsItem>, DbError> {
    let sql = format!(
        "SELECT {NEWS_ITEM_COLUMNS} FROM news_items \
         WHERE org_id = $1 AND source_id = $2 AND external_id = $3"
    );
    sqlx::query_as::<_, NewsItemRow>(&sql)
        .bind(org_id)
        .bind(source_id)
        .bind(external_id)
        .fetch_optional(pool)
        .await?
        .map(NewsItemRow::into_news_item)
        .transpose()
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_news_item(pool: &PgPool, id: Uuid) -> Result<Option<NewsItem>, DbError> {
    let sql = format!("SELECT {NEWS_ITEM_COLUMNS} FROM news_items WHERE id = $1");
    sqlx::query_as::<_, NewsItemRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(NewsItemRow::into_news_item)
        .transpose()
}

/// Items with the given ids, in the order the ids were given. Unknown ids are skipped.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_news_items(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<NewsItem>, DbError> {
    let sql = format!(
        "SELECT {NEWS_ITEM_COLUMNS} FROM news_items \
         WHERE id = ANY($1) \
         ORDER BY array_position($1, id)"
    );
    let rows = sqlx::query_as::<_, NewsItemRow>(&sql)
        .bind(ids)
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(NewsItemRow::into_news_item).collect()
}

/// Most recently published items since `since`, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_news_items(
    pool: &PgPool,
    org_id: Uuid,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<NewsItem>, DbError> {
    let sql = format!(
        "SELECT {NEWS_ITEM_COLUMNS} FROM news_items \
         WHERE org_id = $1 AND published_at >= $2 \
         ORDER BY published_at DESC, id DESC \
         LIMIT $3"
    );
    let rows = sqlx::query_as::<_, NewsItemRow>(&sql)
        .bind(org_id)
        .bind(since)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(NewsItemRow::into_news_item).collect()
}

/// Items created since `since`, oldest first. Used to form merge groups.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_news_items_created_since(
    pool: &PgPool,
    org_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Vec<NewsItem>, DbError> {
    let sql = format!(
        "SELECT {NEWS_ITEM_COLUMNS} FROM news_items \
         WHERE org_id = $1 AND created_at >= $2 \
         ORDER BY created_at ASC, id ASC"
    );
    let rows = sqlx::query_as::<_, NewsItemRow>(&sql)
        .bind(org_id)
        .bind(since)
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(NewsItemRow::into_news_item).collect()
}

/// Earliest-published item in the window carrying `fingerprint`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_news_item_by_fingerprint(
    pool: &PgPool,
    org_id: Uuid,
    fingerprint: &str,
    since: DateTime<Utc>,
) -> Result<Option<NewsItem>, DbError> {
    let sql = format!(
        "SELECT {NEWS_ITEM_COLUMNS} FROM news_items \
         WHERE org_id = $1 AND content_fingerprint = $2 AND published_at >= $3 \
         ORDER BY published_at ASC, id ASC \
         LIMIT 1"
    );
    sqlx::query_as::<_, NewsItemRow>(&sql)
        .bind(org_id)
        .bind(fingerprint)
        .bind(since)
        .fetch_optional(pool)
        .await?
        .map(NewsItemRow::into_news_item)
        .transpose()
}

/// Inserts an item keyed by its natural key. On conflict the existing row is
/// returned untouched; the flag reports whether a new row was written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn insert_news_item(
    pool: &PgPool,
    new: &NewNewsItem,
) -> Result<(NewsItem, bool), DbError> {
    // The no-op DO UPDATE makes RETURNING yield the existing row on conflict;
    // xmax is zero only for freshly inserted tuples.
    let sql = format!(
        "INSERT INTO news_items (id, org_id, source_id, external_id, news_type, sport, headline, \
                                 content, url, author, published_at, teams, players, topics, \
                                 content_fingerprint) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
         ON CONFLICT ON CONSTRAINT news_items_natural_key \
         DO UPDATE SET updated_at = news_items.updated_at \
         RETURNING {NEWS_ITEM_COLUMNS}, (xmax = 0) AS inserted"
    );
    let row = sqlx::query_as::<_, InsertedNewsItemRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(new.org_id)
        .bind(new.source_id)
        .bind(&new.external_id)
        .bind(new.news_type.as_str())
        .bind(new.sport.as_str())
        .bind(&new.headline)
        .bind(&new.content)
        .bind(&new.url)
        .bind(&new.author)
        .bind(new.published_at)
        .bind(&new.teams)
        .bind(&new.players)
        .bind(&new.topics)
        .bind(&new.content_fingerprint)
        .fetch_one(pool)
        .await?;

    Ok((row.item.into_news_item()?, row.inserted))
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the item does not exist.
pub async fn update_news_item_score(
    pool: &PgPool,
    id: Uuid,
    update: &ScoreUpdate,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE news_items \
         SET importance_score = $2, score_breakdown = $3, score_reasoning = $4, \
             scored_at = $5, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(update.importance_score)
    .bind(Json(update.breakdown))
    .bind(&update.reasoning)
    .bind(update.scored_at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the item does not exist.
pub async fn set_news_item_paired(pool: &PgPool, id: Uuid, paired: bool) -> Result<(), DbError> {
    let result =
        sqlx::query("UPDATE news_items SET paired = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(paired)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Saved-query search: newest window, optional filters, highest score first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn search_news_items(
    pool: &PgPool,
    search: &NewsSearch,
) -> Result<Vec<NewsItem>, DbError> {
    let types: Vec<&str> = search.news_types.iter().map(NewsType::as_str).collect();
    let sql = format!(
        "SELECT {NEWS_ITEM_COLUMNS} FROM news_items \
         WHERE org_id = $1 AND published_at >= $2 \
           AND ($3::text IS NULL OR sport = $3) \
           AND (cardinality($4::text[]) = 0 OR news_type = ANY($4)) \
           AND ($5::int IS NULL OR importance_score >= $5) \
         ORDER BY importance_score DESC NULLS LAST, published_at DESC, id ASC \
         LIMIT $6"
    );
    let rows = sqlx::query_as::<_, NewsItemRow>(&sql)
        .bind(search.org_id)
        .bind(search.published_since)
        .bind(search.sport.map(|s| s.as_str()))
        .bind(&types)
        .bind(search.min_score)
        .bind(search.limit)
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(NewsItemRow::into_news_item).collect()
}

/// Folds `duplicates` into `primary` in one transaction.
///
/// Clip matches move to the primary; a duplicate's match is dropped when the
/// primary (or an earlier duplicate) already pairs with the same candidate.
/// The duplicate rows are then deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; the transaction is
/// rolled back in that case.
pub async fn merge_news_items(
    pool: &PgPool,
    org_id: Uuid,
    primary_id: Uuid,
    duplicate_ids: &[Uuid],
) -> Result<MergeOutcome, DbError> {
    let mut tx = pool.begin().await?;

    let dropped_against_primary = sqlx::query(
        "DELETE FROM clip_matches d \
         USING clip_matches p \
         WHERE d.news_item_id = ANY($2) AND p.news_item_id = $1 \
           AND p.candidate_id = d.candidate_id",
    )
    .bind(primary_id)
    .bind(duplicate_ids)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let dropped_between_duplicates = sqlx::query(
        "DELETE FROM clip_matches c \
         WHERE c.news_item_id = ANY($1) \
           AND EXISTS ( \
               SELECT 1 FROM clip_matches o \
               WHERE o.news_item_id = ANY($1) AND o.candidate_id = c.candidate_id \
                 AND (o.created_at, o.id) < (c.created_at, c.id))",
    )
    .bind(duplicate_ids)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let clips_reassigned = sqlx::query(
        "UPDATE clip_matches SET news_item_id = $1, updated_at = NOW() \
         WHERE news_item_id = ANY($2)",
    )
    .bind(primary_id)
    .bind(duplicate_ids)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if clips_reassigned > 0 {
        sqlx::query("UPDATE news_items SET paired = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(primary_id)
            .execute(&mut *tx)
            .await?;
    }

    let items_deleted = sqlx::query("DELETE FROM news_items WHERE org_id = $1 AND id = ANY($2)")
        .bind(org_id)
        .bind(duplicate_ids)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    Ok(MergeOutcome {
        items_deleted,
        clips_reassigned,
        clips_dropped: dropped_against_primary + dropped_between_duplicates,
    })
}
