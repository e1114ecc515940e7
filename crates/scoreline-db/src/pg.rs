//! [`Store`] backed by a Postgres pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scoreline_core::{
    ClipMatch, ClipMatchStatus, GameResult, GameResultDraft, NewsItem, OddsDraft, OddsSnapshot,
    QueryRun, SavedQuery, Source, SourceFetchRun, Sport,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::news_items::{MergeOutcome, NewNewsItem, NewsSearch, ScoreUpdate};
use crate::saved_queries::NewSavedQuery;
use crate::sources::{FetchCounts, NewSource};
use crate::store::Store;
use crate::{clip_matches, games, news_items, saved_queries, sources, DbError};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), DbError> {
        crate::health_check(&self.pool).await
    }

    async fn insert_source(&self, new: &NewSource) -> Result<Source, DbError> {
        sources::insert_source(&self.pool, new).await
    }

    async fn get_source(&self, id: Uuid) -> Result<Option<Source>, DbError> {
        sources::get_source(&self.pool, id).await
    }

    async fn list_due_sources(&self, now: DateTime<Utc>) -> Result<Vec<Source>, DbError> {
        sources::list_due_sources(&self.pool, now).await
    }

    async fn set_source_next_fetch(
        &self,
        id: Uuid,
        next_fetch_at: Option<DateTime<Utc>>,
    ) -> Result<(), DbError> {
        sources::set_source_next_fetch(&self.pool, id, next_fetch_at).await
    }

    async fn record_source_success(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DbError> {
        sources::record_source_success(&self.pool, id, at).await
    }

    async fn record_source_failure(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        message: &str,
    ) -> Result<(), DbError> {
        sources::record_source_failure(&self.pool, id, at, message).await
    }

    async fn create_fetch_run_if_idle(
        &self,
        source: &Source,
        triggered_by: &str,
    ) -> Result<Option<SourceFetchRun>, DbError> {
        sources::create_fetch_run_if_idle(&self.pool, source, triggered_by).await
    }

    async fn get_fetch_run(&self, id: Uuid) -> Result<Option<SourceFetchRun>, DbError> {
        sources::get_fetch_run(&self.pool, id).await
    }

    async fn start_fetch_run(&self, id: Uuid) -> Result<(), DbError> {
        sources::start_fetch_run(&self.pool, id).await
    }

    async fn requeue_fetch_run(&self, id: Uuid, message: &str) -> Result<(), DbError> {
        sources::requeue_fetch_run(&self.pool, id, message).await
    }

    async fn complete_fetch_run(&self, id: Uuid, counts: FetchCounts) -> Result<(), DbError> {
        sources::complete_fetch_run(&self.pool, id, counts).await
    }

    async fn fail_fetch_run(&self, id: Uuid, message: &str) -> Result<(), DbError> {
        sources::fail_fetch_run(&self.pool, id, message).await
    }

    async fn list_fetch_runs(
        &self,
        source_id: Uuid,
        limit: i64,
    ) -> Result<Vec<SourceFetchRun>, DbError> {
        sources::list_fetch_runs(&self.pool, source_id, limit).await
    }

    async fn fail_stale_runs(
        &self,
        older_than: DateTime<Utc>,
        message: &str,
    ) -> Result<u64, DbError> {
        let fetches = sources::fail_stale_fetch_runs(&self.pool, older_than, message).await?;
        let queries = saved_queries::fail_stale_query_runs(&self.pool, older_than, message).await?;
        Ok(fetches + queries)
    }

    async fn find_news_item_by_external_id(
        &self,
        org_id: Uuid,
        source_id: Uuid,
        external_id: &str,
    ) -> Result<Option<NewsItem>, DbError> {
        news_items::find_news_item_by_external_id(&self.pool, org_id, source_id, external_id).await
    }

    async fn get_news_item(&self, id: Uuid) -> Result<Option<NewsItem>, DbError> {
        news_items::get_news_item(&self.pool, id).await
    }

    async fn get_news_items(&self, ids: &[Uuid]) -> Result<Vec<NewsItem>, DbError> {
        news_items::get_news_items(&self.pool, ids).await
    }

    async fn list_recent_news_items(
        &self,
        org_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<NewsItem>, DbError> {
        news_items::list_recent_news_items(&self.pool, org_id, since, limit).await
    }

    async fn list_news_items_created_since(
        &self,
        org_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<NewsItem>, DbError> {
        news_items::list_news_items_created_since(&self.pool, org_id, since).await
    }

    async fn find_news_item_by_fingerprint(
        &self,
        org_id: Uuid,
        fingerprint: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<NewsItem>, DbError> {
        news_items::find_news_item_by_fingerprint(&self.pool, org_id, fingerprint, since).await
    }

    async fn insert_news_item(&self, new: &NewNewsItem) -> Result<(NewsItem, bool), DbError> {
        news_items::insert_news_item(&self.pool, new).await
    }

    async fn update_news_item_score(
        &self,
        id: Uuid,
        update: &ScoreUpdate,
    ) -> Result<(), DbError> {
        news_items::update_news_item_score(&self.pool, id, update).await
    }

    async fn set_news_item_paired(&self, id: Uuid, paired: bool) -> Result<(), DbError> {
        news_items::set_news_item_paired(&self.pool, id, paired).await
    }

    async fn search_news_items(&self, search: &NewsSearch) -> Result<Vec<NewsItem>, DbError> {
        news_items::search_news_items(&self.pool, search).await
    }

    async fn merge_news_items(
        &self,
        org_id: Uuid,
        primary_id: Uuid,
        duplicate_ids: &[Uuid],
    ) -> Result<MergeOutcome, DbError> {
        news_items::merge_news_items(&self.pool, org_id, primary_id, duplicate_ids).await
    }

    async fn upsert_odds_snapshot(
        &self,
        org_id: Uuid,
        source_id: Option<Uuid>,
        sport: Sport,
        draft: &OddsDraft,
    ) -> Result<OddsSnapshot, DbError> {
        games::upsert_odds_snapshot(&self.pool, org_id, source_id, sport, draft).await
    }

    async fn upsert_game_result(
        &self,
        org_id: Uuid,
        source_id: Option<Uuid>,
        sport: Sport,
        draft: &GameResultDraft,
    ) -> Result<GameResult, DbError> {
        games::upsert_game_result(&self.pool, org_id, source_id, sport, draft).await
    }

    async fn list_upcoming_games(
        &self,
        org_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<OddsSnapshot>, DbError> {
        games::list_upcoming_games(&self.pool, org_id, from, until).await
    }

    async fn upsert_clip_match(
        &self,
        news_item_id: Uuid,
        candidate_id: Uuid,
        match_score: f64,
        match_reason: &str,
    ) -> Result<ClipMatch, DbError> {
        clip_matches::upsert_clip_match(
            &self.pool,
            news_item_id,
            candidate_id,
            match_score,
            match_reason,
        )
        .await
    }

    async fn list_clip_matches(&self, news_item_id: Uuid) -> Result<Vec<ClipMatch>, DbError> {
        clip_matches::list_clip_matches(&self.pool, news_item_id).await
    }

    async fn set_clip_match_status(
        &self,
        id: Uuid,
        status: ClipMatchStatus,
    ) -> Result<(), DbError> {
        clip_matches::set_clip_match_status(&self.pool, id, status).await
    }

    async fn insert_saved_query(&self, new: &NewSavedQuery) -> Result<SavedQuery, DbError> {
        saved_queries::insert_saved_query(&self.pool, new).await
    }

    async fn get_saved_query(&self, id: Uuid) -> Result<Option<SavedQuery>, DbError> {
        saved_queries::get_saved_query(&self.pool, id).await
    }

    async fn list_due_queries(&self, now: DateTime<Utc>) -> Result<Vec<SavedQuery>, DbError> {
        saved_queries::list_due_queries(&self.pool, now).await
    }

    async fn set_query_schedule(
        &self,
        id: Uuid,
        last_run_at: DateTime<Utc>,
        next_run_at: Option<DateTime<Utc>>,
    ) -> Result<(), DbError> {
        saved_queries::set_query_schedule(&self.pool, id, last_run_at, next_run_at).await
    }

    async fn create_query_run_if_idle(
        &self,
        query: &SavedQuery,
        triggered_by: &str,
    ) -> Result<Option<QueryRun>, DbError> {
        saved_queries::create_query_run_if_idle(&self.pool, query, triggered_by).await
    }

    async fn get_query_run(&self, id: Uuid) -> Result<Option<QueryRun>, DbError> {
        saved_queries::get_query_run(&self.pool, id).await
    }

    async fn start_query_run(&self, id: Uuid) -> Result<(), DbError> {
        saved_queries::start_query_run(&self.pool, id).await
    }

    async fn complete_query_run(&self, id: Uuid, item_ids: &[Uuid]) -> Result<(), DbError> {
        saved_queries::complete_query_run(&self.pool, id, item_ids).await
    }

    async fn fail_query_run(&self, id: Uuid, message: &str) -> Result<(), DbError> {
        saved_queries::fail_query_run(&self.pool, id, message).await
    }
}
