//! In-process [`Store`] for tests and local dry runs.
//!
//! Mirrors the Postgres semantics: natural-key upserts, the
//! one-active-run guard (checked and inserted under a single lock), and
//! transactional merges.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scoreline_core::{
    ClipMatch, ClipMatchStatus, GameResult, GameResultDraft, NewsItem, OddsDraft, OddsSnapshot,
    QueryRun, RunStatus, SavedQuery, ScheduleType, Source, SourceFetchRun, SourceStatus, Sport,
};
use uuid::Uuid;

use crate::news_items::{MergeOutcome, NewNewsItem, NewsSearch, ScoreUpdate};
use crate::saved_queries::NewSavedQuery;
use crate::sources::{FetchCounts, NewSource};
use crate::store::Store;
use crate::DbError;

#[derive(Debug, Default)]
struct MemoryState {
    sources: HashMap<Uuid, Source>,
    fetch_runs: Vec<SourceFetchRun>,
    news_items: Vec<NewsItem>,
    odds: Vec<OddsSnapshot>,
    results: Vec<GameResult>,
    clips: Vec<ClipMatch>,
    queries: HashMap<Uuid, SavedQuery>,
    query_runs: Vec<QueryRun>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every stored news item, in insertion order.
    #[must_use]
    pub fn news_items(&self) -> Vec<NewsItem> {
        self.state().news_items.clone()
    }

    /// Every fetch run, in creation order.
    #[must_use]
    pub fn fetch_runs(&self) -> Vec<SourceFetchRun> {
        self.state().fetch_runs.clone()
    }

    /// Every query run, in creation order.
    #[must_use]
    pub fn query_runs(&self) -> Vec<QueryRun> {
        self.state().query_runs.clone()
    }

    /// Every clip match, in creation order.
    #[must_use]
    pub fn clip_matches(&self) -> Vec<ClipMatch> {
        self.state().clips.clone()
    }

    #[must_use]
    pub fn odds_snapshots(&self) -> Vec<OddsSnapshot> {
        self.state().odds.clone()
    }

    #[must_use]
    pub fn game_results(&self) -> Vec<GameResult> {
        self.state().results.clone()
    }
}

fn transition<'a, R>(
    runs: &'a mut [R],
    id: Uuid,
    run_id: impl Fn(&R) -> Uuid,
    status: impl Fn(&R) -> RunStatus,
    allowed: &[RunStatus],
    entity: &'static str,
    expected: &'static str,
) -> Result<&'a mut R, DbError> {
    runs.iter_mut()
        .find(|r| run_id(r) == id && allowed.contains(&status(r)))
        .ok_or(DbError::InvalidTransition {
            entity,
            id,
            expected,
        })
}

fn same_matchup(
    external_a: Option<&String>,
    external_b: Option<&String>,
    teams_a: (&str, &str, DateTime<Utc>),
    teams_b: (&str, &str, DateTime<Utc>),
) -> bool {
    match (external_a, external_b) {
        (Some(a), Some(b)) => a == b,
        (None, None) => teams_a == teams_b,
        _ => false,
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }

    async fn insert_source(&self, new: &NewSource) -> Result<Source, DbError> {
        let now = Utc::now();
        let source = Source {
            id: Uuid::new_v4(),
            org_id: new.org_id,
            name: new.name.clone(),
            adapter_type: new.adapter_type.clone(),
            sport: new.sport,
            config: new.config.clone(),
            schedule_type: new.schedule_type,
            refresh_interval_minutes: new.refresh_interval_minutes,
            cron_expression: new.cron_expression.clone(),
            status: new.status,
            last_fetch_at: None,
            next_fetch_at: new.next_fetch_at,
            last_success_at: None,
            last_error_at: None,
            last_error_message: None,
            error_count: 0,
            consecutive_errors: 0,
            created_at: now,
            updated_at: now,
        };
        self.state().sources.insert(source.id, source.clone());
        Ok(source)
    }

    async fn get_source(&self, id: Uuid) -> Result<Option<Source>, DbError> {
        Ok(self.state().sources.get(&id).cloned())
    }

    async fn list_due_sources(&self, now: DateTime<Utc>) -> Result<Vec<Source>, DbError> {
        let mut due: Vec<Source> = self
            .state()
            .sources
            .values()
            .filter(|s| s.status == SourceStatus::Active)
            .filter(|s| s.schedule_type != ScheduleType::Manual)
            .filter(|s| s.next_fetch_at.is_none_or(|next| next <= now))
            .cloned()
            .collect();
        due.sort_by_key(|s| (s.next_fetch_at, s.created_at));
        Ok(due)
    }

    async fn set_source_next_fetch(
        &self,
        id: Uuid,
        next_fetch_at: Option<DateTime<Utc>>,
    ) -> Result<(), DbError> {
        let mut state = self.state();
        let source = state.sources.get_mut(&id).ok_or(DbError::NotFound)?;
        source.next_fetch_at = next_fetch_at;
        source.updated_at = Utc::now();
        Ok(())
    }

    async fn record_source_success(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DbError> {
        let mut state = self.state();
        let source = state.sources.get_mut(&id).ok_or(DbError::NotFound)?;
        source.last_fetch_at = Some(at);
        source.last_success_at = Some(at);
        source.consecutive_errors = 0;
        source.updated_at = Utc::now();
        Ok(())
    }

    async fn record_source_failure(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        message: &str,
    ) -> Result<(), DbError> {
        let mut state = self.state();
        let source = state.sources.get_mut(&id).ok_or(DbError::NotFound)?;
        source.last_fetch_at = Some(at);
        source.last_error_at = Some(at);
        source.last_error_message = Some(message.to_string());
        source.error_count += 1;
        source.consecutive_errors += 1;
        source.updated_at = Utc::now();
        Ok(())
    }

    async fn create_fetch_run_if_idle(
        &self,
        source: &Source,
        triggered_by: &str,
    ) -> Result<Option<SourceFetchRun>, DbError> {
        let mut state = self.state();
        let busy = state
            .fetch_runs
            .iter()
            .any(|r| r.source_id == source.id && r.status.is_active());
        if busy {
            return Ok(None);
        }

        let run = SourceFetchRun {
            id: Uuid::new_v4(),
            source_id: source.id,
            org_id: source.org_id,
            status: RunStatus::Queued,
            triggered_by: triggered_by.to_string(),
            items_fetched: 0,
            items_new: 0,
            items_duplicate: 0,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        };
        state.fetch_runs.push(run.clone());
        Ok(Some(run))
    }

    async fn get_fetch_run(&self, id: Uuid) -> Result<Option<SourceFetchRun>, DbError> {
        Ok(self.state().fetch_runs.iter().find(|r| r.id == id).cloned())
    }

    async fn start_fetch_run(&self, id: Uuid) -> Result<(), DbError> {
        let mut state = self.state();
        let run = transition(
            &mut state.fetch_runs,
            id,
            |r| r.id,
            |r| r.status,
            &[RunStatus::Queued],
            "fetch run",
            "QUEUED",
        )?;
        run.status = RunStatus::Running;
        run.started_at.get_or_insert_with(Utc::now);
        Ok(())
    }

    async fn requeue_fetch_run(&self, id: Uuid, message: &str) -> Result<(), DbError> {
        let mut state = self.state();
        let run = transition(
            &mut state.fetch_runs,
            id,
            |r| r.id,
            |r| r.status,
            &[RunStatus::Running],
            "fetch run",
            "RUNNING",
        )?;
        run.status = RunStatus::Queued;
        run.error_message = Some(message.to_string());
        Ok(())
    }

    async fn complete_fetch_run(&self, id: Uuid, counts: FetchCounts) -> Result<(), DbError> {
        let mut state = self.state();
        let run = transition(
            &mut state.fetch_runs,
            id,
            |r| r.id,
            |r| r.status,
            &[RunStatus::Running],
            "fetch run",
            "RUNNING",
        )?;
        run.status = RunStatus::Succeeded;
        run.finished_at = Some(Utc::now());
        run.error_message = None;
        run.items_fetched = counts.items_fetched;
        run.items_new = counts.items_new;
        run.items_duplicate = counts.items_duplicate;
        Ok(())
    }

    async fn fail_fetch_run(&self, id: Uuid, message: &str) -> Result<(), DbError> {
        let mut state = self.state();
        let run = transition(
            &mut state.fetch_runs,
            id,
            |r| r.id,
            |r| r.status,
            &[RunStatus::Queued, RunStatus::Running],
            "fetch run",
            "QUEUED or RUNNING",
        )?;
        run.status = RunStatus::Failed;
        run.finished_at = Some(Utc::now());
        run.error_message = Some(message.to_string());
        Ok(())
    }

    async fn list_fetch_runs(
        &self,
        source_id: Uuid,
        limit: i64,
    ) -> Result<Vec<SourceFetchRun>, DbError> {
        let mut runs: Vec<SourceFetchRun> = self
            .state()
            .fetch_runs
            .iter()
            .rev()
            .filter(|r| r.source_id == source_id)
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        runs.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(runs)
    }

    async fn fail_stale_runs(
        &self,
        older_than: DateTime<Utc>,
        message: &str,
    ) -> Result<u64, DbError> {
        let now = Utc::now();
        let mut state = self.state();
        let mut failed = 0;

        for run in state
            .fetch_runs
            .iter_mut()
            .filter(|r| r.status.is_active() && r.created_at < older_than)
        {
            run.status = RunStatus::Failed;
            run.finished_at = Some(now);
            run.error_message = Some(message.to_string());
            failed += 1;
        }
        for run in state
            .query_runs
            .iter_mut()
            .filter(|r| r.status.is_active() && r.created_at < older_than)
        {
            run.status = RunStatus::Failed;
            run.finished_at = Some(now);
            run.error_message = Some(message.to_string());
            failed += 1;
        }

        Ok(failed)
    }

    async fn find_news_item_by_external_id(
        &self,
        org_id: Uuid,
        source_id: Uuid,
        external_id: &str,
    ) -> Result<Option<NewsItem>, DbError> {
        Ok(self
            .state()
            .news_items
            .iter()
            .find(|i| i.org_id == org_id && i.source_id == source_id && i.external_id == external_id)
            .cloned())
    }

    async fn get_news_item(&self, id: Uuid) -> Result<Option<NewsItem>, DbError> {
        Ok(self.state().news_items.iter().find(|i| i.id == id).cloned())
    }

    async fn get_news_items(&self, ids: &[Uuid]) -> Result<Vec<NewsItem>, DbError> {
        let state = self.state();
        Ok(ids
            .iter()
            .filter_map(|id| state.news_items.iter().find(|i| i.id == *id).cloned())
            .collect())
    }

    async fn list_recent_news_items(
        &self,
        org_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<NewsItem>, DbError> {
        let mut items: Vec<NewsItem> = self
            .state()
            .news_items
            .iter()
            .filter(|i| i.org_id == org_id && i.published_at >= since)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        items.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(items)
    }

    async fn list_news_items_created_since(
        &self,
        org_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<NewsItem>, DbError> {
        let mut items: Vec<NewsItem> = self
            .state()
            .news_items
            .iter()
            .filter(|i| i.org_id == org_id && i.created_at >= since)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.created_at);
        Ok(items)
    }

    async fn find_news_item_by_fingerprint(
        &self,
        org_id: Uuid,
        fingerprint: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<NewsItem>, DbError> {
        let state = self.state();
        let mut matches: Vec<&NewsItem> = state
            .news_items
            .iter()
            .filter(|i| {
                i.org_id == org_id
                    && i.content_fingerprint == fingerprint
                    && i.published_at >= since
            })
            .collect();
        matches.sort_by_key(|i| i.published_at);
        Ok(matches.first().map(|i| (*i).clone()))
    }

    async fn insert_news_item(&self, new: &NewNewsItem) -> Result<(NewsItem, bool), DbError> {
        let mut state = self.state();
        if let Some(existing) = state.news_items.iter().find(|i| {
            i.org_id == new.org_id
                && i.source_id == new.source_id
                && i.external_id == new.external_id
        }) {
            return Ok((existing.clone(), false));
        }

        let now = Utc::now();
        let item = NewsItem {
            id: Uuid::new_v4(),
            org_id: new.org_id,
            source_id: new.source_id,
            external_id: new.external_id.clone(),
            news_type: new.news_type,
            sport: new.sport,
            headline: new.headline.clone(),
            content: new.content.clone(),
            url: new.url.clone(),
            author: new.author.clone(),
            published_at: new.published_at,
            teams: new.teams.clone(),
            players: new.players.clone(),
            topics: new.topics.clone(),
            content_fingerprint: new.content_fingerprint.clone(),
            importance_score: None,
            score_breakdown: None,
            score_reasoning: None,
            scored_at: None,
            paired: false,
            created_at: now,
            updated_at: now,
        };
        state.news_items.push(item.clone());
        Ok((item, true))
    }

    async fn update_news_item_score(
        &self,
        id: Uuid,
        update: &ScoreUpdate,
    ) -> Result<(), DbError> {
        let mut state = self.state();
        let item = state
            .news_items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(DbError::NotFound)?;
        item.importance_score = Some(update.importance_score);
        item.score_breakdown = Some(update.breakdown);
        item.score_reasoning = Some(update.reasoning.clone());
        item.scored_at = Some(update.scored_at);
        item.updated_at = Utc::now();
        Ok(())
    }

    async fn set_news_item_paired(&self, id: Uuid, paired: bool) -> Result<(), DbError> {
        let mut state = self.state();
        let item = state
            .news_items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(DbError::NotFound)?;
        item.paired = paired;
        item.updated_at = Utc::now();
        Ok(())
    }

    async fn search_news_items(&self, search: &NewsSearch) -> Result<Vec<NewsItem>, DbError> {
        let mut items: Vec<NewsItem> = self
            .state()
            .news_items
            .iter()
            .filter(|i| i.org_id == search.org_id && i.published_at >= search.published_since)
            .filter(|i| search.sport.is_none_or(|sport| i.sport == sport))
            .filter(|i| search.news_types.is_empty() || search.news_types.contains(&i.news_type))
            .filter(|i| {
                search
                    .min_score
                    .is_none_or(|min| i.importance_score.is_some_and(|s| s >= min))
            })
            .cloned()
            .collect();

        // Scored items first, highest score first, then newest.
        items.sort_by(|a, b| {
            let a_key = a.importance_score.map(|s| -i64::from(s));
            let b_key = b.importance_score.map(|s| -i64::from(s));
            a_key
                .is_none()
                .cmp(&b_key.is_none())
                .then(a_key.cmp(&b_key))
                .then(b.published_at.cmp(&a.published_at))
        });
        items.truncate(usize::try_from(search.limit).unwrap_or(0));
        Ok(items)
    }

    async fn merge_news_items(
        &self,
        org_id: Uuid,
        primary_id: Uuid,
        duplicate_ids: &[Uuid],
    ) -> Result<MergeOutcome, DbError> {
        let mut state = self.state();
        let now = Utc::now();
        let mut outcome = MergeOutcome::default();

        let mut claimed: Vec<Uuid> = state
            .clips
            .iter()
            .filter(|c| c.news_item_id == primary_id)
            .map(|c| c.candidate_id)
            .collect();

        let mut kept = Vec::with_capacity(state.clips.len());
        for mut clip in std::mem::take(&mut state.clips) {
            if duplicate_ids.contains(&clip.news_item_id) {
                if claimed.contains(&clip.candidate_id) {
                    outcome.clips_dropped += 1;
                    continue;
                }
                claimed.push(clip.candidate_id);
                clip.news_item_id = primary_id;
                clip.updated_at = now;
                outcome.clips_reassigned += 1;
            }
            kept.push(clip);
        }
        state.clips = kept;

        if outcome.clips_reassigned > 0 {
            if let Some(primary) = state.news_items.iter_mut().find(|i| i.id == primary_id) {
                primary.paired = true;
                primary.updated_at = now;
            }
        }

        let before = state.news_items.len();
        state
            .news_items
            .retain(|i| !(i.org_id == org_id && duplicate_ids.contains(&i.id)));
        outcome.items_deleted = (before - state.news_items.len()) as u64;

        Ok(outcome)
    }

    async fn upsert_odds_snapshot(
        &self,
        org_id: Uuid,
        source_id: Option<Uuid>,
        sport: Sport,
        draft: &OddsDraft,
    ) -> Result<OddsSnapshot, DbError> {
        let now = Utc::now();
        let mut state = self.state();
        let existing = state.odds.iter_mut().find(|o| {
            o.org_id == org_id
                && same_matchup(
                    o.external_game_id.as_ref(),
                    draft.external_game_id.as_ref(),
                    (o.home_team.as_str(), o.away_team.as_str(), o.game_date),
                    (draft.home_team.as_str(), draft.away_team.as_str(), draft.game_date),
                )
        });

        if let Some(snapshot) = existing {
            snapshot.source_id = source_id;
            snapshot.home_team.clone_from(&draft.home_team);
            snapshot.away_team.clone_from(&draft.away_team);
            snapshot.game_date = draft.game_date;
            snapshot.home_moneyline = draft.home_moneyline;
            snapshot.away_moneyline = draft.away_moneyline;
            snapshot.spread = draft.spread;
            snapshot.total = draft.total;
            snapshot.bookmaker.clone_from(&draft.bookmaker);
            snapshot.captured_at = now;
            snapshot.updated_at = now;
            return Ok(snapshot.clone());
        }

        let snapshot = OddsSnapshot {
            id: Uuid::new_v4(),
            org_id,
            source_id,
            sport,
            external_game_id: draft.external_game_id.clone(),
            home_team: draft.home_team.clone(),
            away_team: draft.away_team.clone(),
            game_date: draft.game_date,
            home_moneyline: draft.home_moneyline,
            away_moneyline: draft.away_moneyline,
            spread: draft.spread,
            total: draft.total,
            bookmaker: draft.bookmaker.clone(),
            captured_at: now,
            updated_at: now,
        };
        state.odds.push(snapshot.clone());
        Ok(snapshot)
    }

    async fn upsert_game_result(
        &self,
        org_id: Uuid,
        source_id: Option<Uuid>,
        sport: Sport,
        draft: &GameResultDraft,
    ) -> Result<GameResult, DbError> {
        let now = Utc::now();
        let outcome = draft.resolved_outcome();
        let mut state = self.state();
        let existing = state.results.iter_mut().find(|r| {
            r.org_id == org_id
                && same_matchup(
                    r.external_game_id.as_ref(),
                    draft.external_game_id.as_ref(),
                    (r.home_team.as_str(), r.away_team.as_str(), r.game_date),
                    (draft.home_team.as_str(), draft.away_team.as_str(), draft.game_date),
                )
        });

        if let Some(result) = existing {
            result.source_id = source_id;
            result.home_team.clone_from(&draft.home_team);
            result.away_team.clone_from(&draft.away_team);
            result.game_date = draft.game_date;
            result.home_score = draft.home_score;
            result.away_score = draft.away_score;
            result.outcome = outcome;
            result.updated_at = now;
            return Ok(result.clone());
        }

        let result = GameResult {
            id: Uuid::new_v4(),
            org_id,
            source_id,
            sport,
            external_game_id: draft.external_game_id.clone(),
            home_team: draft.home_team.clone(),
            away_team: draft.away_team.clone(),
            game_date: draft.game_date,
            home_score: draft.home_score,
            away_score: draft.away_score,
            outcome,
            updated_at: now,
        };
        state.results.push(result.clone());
        Ok(result)
    }

    async fn list_upcoming_games(
        &self,
        org_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<OddsSnapshot>, DbError> {
        let mut games: Vec<OddsSnapshot> = self
            .state()
            .odds
            .iter()
            .filter(|o| o.org_id == org_id && o.game_date > from && o.game_date <= until)
            .cloned()
            .collect();
        games.sort_by_key(|o| o.game_date);
        Ok(games)
    }

    async fn upsert_clip_match(
        &self,
        news_item_id: Uuid,
        candidate_id: Uuid,
        match_score: f64,
        match_reason: &str,
    ) -> Result<ClipMatch, DbError> {
        let now = Utc::now();
        let mut state = self.state();
        if !state.news_items.iter().any(|i| i.id == news_item_id) {
            return Err(DbError::NotFound);
        }

        if let Some(existing) = state
            .clips
            .iter_mut()
            .find(|c| c.news_item_id == news_item_id && c.candidate_id == candidate_id)
        {
            existing.match_score = match_score;
            existing.match_reason = match_reason.to_string();
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let clip = ClipMatch {
            id: Uuid::new_v4(),
            news_item_id,
            candidate_id,
            match_score,
            match_reason: match_reason.to_string(),
            status: ClipMatchStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        state.clips.push(clip.clone());
        Ok(clip)
    }

    async fn list_clip_matches(&self, news_item_id: Uuid) -> Result<Vec<ClipMatch>, DbError> {
        let mut clips: Vec<ClipMatch> = self
            .state()
            .clips
            .iter()
            .filter(|c| c.news_item_id == news_item_id)
            .cloned()
            .collect();
        clips.sort_by(|a, b| b.match_score.total_cmp(&a.match_score));
        Ok(clips)
    }

    async fn set_clip_match_status(
        &self,
        id: Uuid,
        status: ClipMatchStatus,
    ) -> Result<(), DbError> {
        let mut state = self.state();
        let clip = state
            .clips
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(DbError::NotFound)?;
        clip.status = status;
        clip.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_saved_query(&self, new: &NewSavedQuery) -> Result<SavedQuery, DbError> {
        let query = SavedQuery {
            id: Uuid::new_v4(),
            org_id: new.org_id,
            name: new.name.clone(),
            sport: new.sport,
            news_types: new.news_types.clone(),
            min_score: new.min_score,
            lookback_hours: new.lookback_hours,
            schedule_type: new.schedule_type,
            refresh_interval_minutes: new.refresh_interval_minutes,
            cron_expression: new.cron_expression.clone(),
            enabled: new.enabled,
            last_run_at: None,
            next_run_at: None,
            created_at: Utc::now(),
        };
        self.state().queries.insert(query.id, query.clone());
        Ok(query)
    }

    async fn get_saved_query(&self, id: Uuid) -> Result<Option<SavedQuery>, DbError> {
        Ok(self.state().queries.get(&id).cloned())
    }

    async fn list_due_queries(&self, now: DateTime<Utc>) -> Result<Vec<SavedQuery>, DbError> {
        let mut due: Vec<SavedQuery> = self
            .state()
            .queries
            .values()
            .filter(|q| q.enabled && q.schedule_type != ScheduleType::Manual)
            .filter(|q| q.next_run_at.is_none_or(|next| next <= now))
            .cloned()
            .collect();
        due.sort_by_key(|q| (q.next_run_at, q.created_at));
        Ok(due)
    }

    async fn set_query_schedule(
        &self,
        id: Uuid,
        last_run_at: DateTime<Utc>,
        next_run_at: Option<DateTime<Utc>>,
    ) -> Result<(), DbError> {
        let mut state = self.state();
        let query = state.queries.get_mut(&id).ok_or(DbError::NotFound)?;
        query.last_run_at = Some(last_run_at);
        query.next_run_at = next_run_at;
        Ok(())
    }

    async fn create_query_run_if_idle(
        &self,
        query: &SavedQuery,
        triggered_by: &str,
    ) -> Result<Option<QueryRun>, DbError> {
        let mut state = self.state();
        let busy = state
            .query_runs
            .iter()
            .any(|r| r.query_id == query.id && r.status.is_active());
        if busy {
            return Ok(None);
        }

        let run = QueryRun {
            id: Uuid::new_v4(),
            query_id: query.id,
            org_id: query.org_id,
            status: RunStatus::Queued,
            triggered_by: triggered_by.to_string(),
            result_count: 0,
            item_ids: Vec::new(),
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        };
        state.query_runs.push(run.clone());
        Ok(Some(run))
    }

    async fn get_query_run(&self, id: Uuid) -> Result<Option<QueryRun>, DbError> {
        Ok(self.state().query_runs.iter().find(|r| r.id == id).cloned())
    }

    async fn start_query_run(&self, id: Uuid) -> Result<(), DbError> {
        let mut state = self.state();
        let run = transition(
            &mut state.query_runs,
            id,
            |r| r.id,
            |r| r.status,
            &[RunStatus::Queued],
            "query run",
            "QUEUED",
        )?;
        run.status = RunStatus::Running;
        run.started_at.get_or_insert_with(Utc::now);
        Ok(())
    }

    async fn complete_query_run(&self, id: Uuid, item_ids: &[Uuid]) -> Result<(), DbError> {
        let mut state = self.state();
        let run = transition(
            &mut state.query_runs,
            id,
            |r| r.id,
            |r| r.status,
            &[RunStatus::Running],
            "query run",
            "RUNNING",
        )?;
        run.status = RunStatus::Succeeded;
        run.finished_at = Some(Utc::now());
        run.result_count = i32::try_from(item_ids.len()).unwrap_or(i32::MAX);
        run.item_ids = item_ids.to_vec();
        Ok(())
    }

    async fn fail_query_run(&self, id: Uuid, message: &str) -> Result<(), DbError> {
        let mut state = self.state();
        let run = transition(
            &mut state.query_runs,
            id,
            |r| r.id,
            |r| r.status,
            &[RunStatus::Queued, RunStatus::Running],
            "query run",
            "QUEUED or RUNNING",
        )?;
        run.status = RunStatus::Failed;
        run.finished_at = Some(Utc::now());
        run.error_message = Some(message.to_string());
        Ok(())
    }
}
