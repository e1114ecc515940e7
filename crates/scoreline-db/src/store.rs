//! The persistence seam used by the pipeline and the server.
//!
//! [`crate::PgStore`] backs it with Postgres; [`crate::MemoryStore`] keeps
//! everything in process for tests and dry runs. Both honour the same
//! natural-key upserts and the one-active-run-per-source guard.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scoreline_core::{
    ClipMatch, ClipMatchStatus, GameResult, GameResultDraft, NewsItem, OddsDraft, OddsSnapshot,
    QueryRun, SavedQuery, Source, SourceFetchRun, Sport,
};
use uuid::Uuid;

use crate::news_items::{MergeOutcome, NewNewsItem, NewsSearch, ScoreUpdate};
use crate::saved_queries::NewSavedQuery;
use crate::sources::{FetchCounts, NewSource};
use crate::DbError;

#[async_trait]
pub trait Store: Send + Sync {
    /// Verifies the backing store is reachable.
    async fn ping(&self) -> Result<(), DbError>;

    // -- sources -----------------------------------------------------------

    async fn insert_source(&self, new: &NewSource) -> Result<Source, DbError>;
    async fn get_source(&self, id: Uuid) -> Result<Option<Source>, DbError>;
    async fn list_due_sources(&self, now: DateTime<Utc>) -> Result<Vec<Source>, DbError>;
    async fn set_source_next_fetch(
        &self,
        id: Uuid,
        next_fetch_at: Option<DateTime<Utc>>,
    ) -> Result<(), DbError>;
    async fn record_source_success(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DbError>;
    async fn record_source_failure(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        message: &str,
    ) -> Result<(), DbError>;

    // -- fetch runs ----------------------------------------------------------

    /// Atomically create a `QUEUED` run unless one is already queued or running.
    async fn create_fetch_run_if_idle(
        &self,
        source: &Source,
        triggered_by: &str,
    ) -> Result<Option<SourceFetchRun>, DbError>;
    async fn get_fetch_run(&self, id: Uuid) -> Result<Option<SourceFetchRun>, DbError>;
    async fn start_fetch_run(&self, id: Uuid) -> Result<(), DbError>;
    async fn requeue_fetch_run(&self, id: Uuid, message: &str) -> Result<(), DbError>;
    async fn complete_fetch_run(&self, id: Uuid, counts: FetchCounts) -> Result<(), DbError>;
    async fn fail_fetch_run(&self, id: Uuid, message: &str) -> Result<(), DbError>;
    async fn list_fetch_runs(
        &self,
        source_id: Uuid,
        limit: i64,
    ) -> Result<Vec<SourceFetchRun>, DbError>;

    /// Fail queued or running fetch and query runs created before `older_than`.
    async fn fail_stale_runs(
        &self,
        older_than: DateTime<Utc>,
        message: &str,
    ) -> Result<u64, DbError>;

    // -- news items ----------------------------------------------------------

    async fn find_news_item_by_external_id(
        &self,
        org_id: Uuid,
        source_id: Uuid,
        external_id: &str,
    ) -> Result<Option<NewsItem>, DbError>;
    async fn get_news_item(&self, id: Uuid) -> Result<Option<NewsItem>, DbError>;
    async fn get_news_items(&self, ids: &[Uuid]) -> Result<Vec<NewsItem>, DbError>;
    async fn list_recent_news_items(
        &self,
        org_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<NewsItem>, DbError>;
    async fn list_news_items_created_since(
        &self,
        org_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<NewsItem>, DbError>;
    async fn find_news_item_by_fingerprint(
        &self,
        org_id: Uuid,
        fingerprint: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<NewsItem>, DbError>;
    /// Insert keyed by `(org_id, source_id, external_id)`. The flag is `false`
    /// when the key already existed and the stored row was returned instead.
    async fn insert_news_item(&self, new: &NewNewsItem) -> Result<(NewsItem, bool), DbError>;
    async fn update_news_item_score(&self, id: Uuid, update: &ScoreUpdate)
        -> Result<(), DbError>;
    async fn set_news_item_paired(&self, id: Uuid, paired: bool) -> Result<(), DbError>;
    async fn search_news_items(&self, search: &NewsSearch) -> Result<Vec<NewsItem>, DbError>;
    /// Fold duplicates into a primary item inside one transaction.
    async fn merge_news_items(
        &self,
        org_id: Uuid,
        primary_id: Uuid,
        duplicate_ids: &[Uuid],
    ) -> Result<MergeOutcome, DbError>;

    // -- games ---------------------------------------------------------------

    async fn upsert_odds_snapshot(
        &self,
        org_id: Uuid,
        source_id: Option<Uuid>,
        sport: Sport,
        draft: &OddsDraft,
    ) -> Result<OddsSnapshot, DbError>;
    async fn upsert_game_result(
        &self,
        org_id: Uuid,
        source_id: Option<Uuid>,
        sport: Sport,
        draft: &GameResultDraft,
    ) -> Result<GameResult, DbError>;
    async fn list_upcoming_games(
        &self,
        org_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<OddsSnapshot>, DbError>;

    // -- clip matches --------------------------------------------------------

    async fn upsert_clip_match(
        &self,
        news_item_id: Uuid,
        candidate_id: Uuid,
        match_score: f64,
        match_reason: &str,
    ) -> Result<ClipMatch, DbError>;
    async fn list_clip_matches(&self, news_item_id: Uuid) -> Result<Vec<ClipMatch>, DbError>;
    async fn set_clip_match_status(
        &self,
        id: Uuid,
        status: ClipMatchStatus,
    ) -> Result<(), DbError>;

    // -- saved queries -------------------------------------------------------

    async fn insert_saved_query(&self, new: &NewSavedQuery) -> Result<SavedQuery, DbError>;
    async fn get_saved_query(&self, id: Uuid) -> Result<Option<SavedQuery>, DbError>;
    async fn list_due_queries(&self, now: DateTime<Utc>) -> Result<Vec<SavedQuery>, DbError>;
    async fn set_query_schedule(
        &self,
        id: Uuid,
        last_run_at: DateTime<Utc>,
        next_run_at: Option<DateTime<Utc>>,
    ) -> Result<(), DbError>;
    async fn create_query_run_if_idle(
        &self,
        query: &SavedQuery,
        triggered_by: &str,
    ) -> Result<Option<QueryRun>, DbError>;
    async fn get_query_run(&self, id: Uuid) -> Result<Option<QueryRun>, DbError>;
    async fn start_query_run(&self, id: Uuid) -> Result<(), DbError>;
    async fn complete_query_run(&self, id: Uuid, item_ids: &[Uuid]) -> Result<(), DbError>;
    async fn fail_query_run(&self, id: Uuid, message: &str) -> Result<(), DbError>;
}

/// Shared handle used across workers and request handlers.
pub type SharedStore = Arc<dyn Store>;
