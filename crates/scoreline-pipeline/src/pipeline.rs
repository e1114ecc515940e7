//! The job stages.
//!
//! `source-fetch` pulls a batch through an adapter, drops duplicates,
//! extracts entities and persists new items. `importance-score` scores one
//! item and, above the pairing threshold, hands it to `clip-pair`.
//! `scheduled-query` runs a saved filter and hands the result to `export`.
//! Each stage enqueues its successor only after its own writes return.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Utc};
use scoreline_core::{
    load_teams, AppConfig, NewsItem, QueryRun, RunStatus, Source, SourceFetchRun, SourceStatus,
    UpcomingGame,
};
use scoreline_db::{FetchCounts, NewNewsItem, NewsSearch, ScoreUpdate, SharedStore};
use scoreline_intel::scorer::ScoreSubject;
use scoreline_intel::{content_fingerprint, EntityExtractor, ImportanceScore, ImportanceScorer};
use scoreline_jobs::{JobContext, JobPayload, JobQueue};
use uuid::Uuid;

use crate::adapters::{AdapterRegistry, FetchRequest, RssAdapter};
use crate::clips::{ClipFinder, ClipPairer, NoClipFinder, PairOutcome, TeiQdrantClipFinder};
use crate::dedup::{DedupEngine, DedupPolicy};
use crate::error::PipelineError;
use crate::export::{ExportDocument, ExportSink, JsonFileExportSink};

/// Upper bound on items a saved query returns.
const QUERY_RESULT_LIMIT: i64 = 100;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Items requested from an adapter per fetch.
    pub fetch_limit: usize,
    /// Items scoring at least this are sent to clip pairing.
    pub clip_pair_min_score: i32,
    pub dedup: DedupPolicy,
    /// How far ahead scoring looks for upcoming games.
    pub upcoming_game_horizon_hours: i64,
    pub export_dir: PathBuf,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            fetch_limit: 50,
            clip_pair_min_score: 70,
            dedup: DedupPolicy::default(),
            upcoming_game_horizon_hours: 72,
            export_dir: PathBuf::from("exports"),
        }
    }
}

impl PipelineSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            fetch_limit: config.fetch_limit,
            clip_pair_min_score: config.clip_pair_min_score,
            export_dir: config.export_dir.clone(),
            ..Self::default()
        }
    }
}

/// What a finished fetch run recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub counts: FetchCounts,
    pub odds_upserted: usize,
    pub results_upserted: usize,
}

pub struct Pipeline {
    store: SharedStore,
    queue: JobQueue,
    adapters: AdapterRegistry,
    extractor: EntityExtractor,
    scorer: ImportanceScorer,
    dedup: DedupEngine,
    clips: ClipPairer,
    export: Arc<dyn ExportSink>,
    settings: PipelineSettings,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("adapters", &self.adapters)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// A pipeline with the built-in team dictionary, the default authority
    /// table, no clip finder, and JSON file exports under
    /// `settings.export_dir`.
    #[must_use]
    pub fn new(
        store: SharedStore,
        queue: JobQueue,
        adapters: AdapterRegistry,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            dedup: DedupEngine::new(Arc::clone(&store), settings.dedup),
            clips: ClipPairer::new(Arc::clone(&store), Arc::new(NoClipFinder)),
            export: Arc::new(JsonFileExportSink::new(settings.export_dir.clone())),
            extractor: EntityExtractor::default(),
            scorer: ImportanceScorer::default(),
            store,
            queue,
            adapters,
            settings,
        }
    }

    /// Wires the production collaborators from configuration: the RSS
    /// adapter, the teams file when `teams_path` is set, and the TEI/Qdrant
    /// clip finder when both URLs are set.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the teams file is unreadable or invalid,
    /// or an HTTP client cannot be built.
    pub fn from_app_config(
        config: &AppConfig,
        store: SharedStore,
        queue: JobQueue,
    ) -> Result<Self, PipelineError> {
        let rss = RssAdapter::from_app_config(config)?;
        let adapters = AdapterRegistry::new().with(Arc::new(rss));
        let mut pipeline = Self::new(
            store,
            queue,
            adapters,
            PipelineSettings::from_app_config(config),
        );

        if let Some(path) = &config.teams_path {
            let teams = load_teams(path)?;
            tracing::info!(
                path = %path.display(),
                sports = teams.teams.len(),
                "pipeline: loaded team dictionary"
            );
            pipeline = pipeline.with_extractor(EntityExtractor::new(teams));
        }

        match TeiQdrantClipFinder::from_app_config(config)? {
            Some(finder) => pipeline = pipeline.with_clip_finder(Arc::new(finder)),
            None => {
                tracing::info!("pipeline: TEI/Qdrant not configured; clip pairing finds no candidates");
            }
        }

        Ok(pipeline)
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: EntityExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    #[must_use]
    pub fn with_scorer(mut self, scorer: ImportanceScorer) -> Self {
        self.scorer = scorer;
        self
    }

    #[must_use]
    pub fn with_clip_finder(mut self, finder: Arc<dyn ClipFinder>) -> Self {
        self.clips = ClipPairer::new(Arc::clone(&self.store), finder);
        self
    }

    #[must_use]
    pub fn with_export_sink(mut self, sink: Arc<dyn ExportSink>) -> Self {
        self.export = sink;
        self
    }

    #[must_use]
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    #[must_use]
    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    #[must_use]
    pub fn dedup(&self) -> &DedupEngine {
        &self.dedup
    }

    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    // -- source-fetch --------------------------------------------------------

    /// Executes one attempt of a fetch run.
    ///
    /// On failure the run goes back to `QUEUED` while retryable attempts
    /// remain, and to `FAILED` otherwise. A run that already finished is
    /// left alone and reported as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] describing why the attempt failed.
    pub async fn run_source_fetch(
        &self,
        ctx: &JobContext,
        source_id: Uuid,
        fetch_run_id: Uuid,
        org_id: Uuid,
    ) -> Result<Option<FetchSummary>, PipelineError> {
        let run = self
            .store
            .get_fetch_run(fetch_run_id)
            .await?
            .ok_or(PipelineError::FetchRunNotFound(fetch_run_id))?;
        if run.org_id != org_id || run.source_id != source_id {
            return Err(PipelineError::OrgMismatch {
                expected: org_id,
                record: run.id,
            });
        }

        match run.status {
            RunStatus::Queued => self.store.start_fetch_run(run.id).await?,
            // A previous attempt died mid-flight.
            RunStatus::Running => {}
            RunStatus::Succeeded | RunStatus::Failed => {
                tracing::warn!(fetch_run_id = %run.id, status = %run.status, "pipeline: fetch run already finished, skipping");
                return Ok(None);
            }
        }

        match self.ingest(&run).await {
            Ok(summary) => {
                self.store.complete_fetch_run(run.id, summary.counts).await?;
                tracing::info!(
                    source_id = %source_id,
                    fetch_run_id = %run.id,
                    fetched = summary.counts.items_fetched,
                    new = summary.counts.items_new,
                    duplicate = summary.counts.items_duplicate,
                    "pipeline: fetch run complete"
                );
                Ok(Some(summary))
            }
            Err(e) => {
                let message = e.to_string();
                if e.is_retryable() && !ctx.is_final_attempt() {
                    tracing::warn!(fetch_run_id = %run.id, attempt = ctx.attempt, error = %e, "pipeline: fetch attempt failed, will retry");
                    self.store.requeue_fetch_run(run.id, &message).await?;
                } else {
                    tracing::error!(fetch_run_id = %run.id, attempt = ctx.attempt, error = %e, "pipeline: fetch run failed");
                    self.store.fail_fetch_run(run.id, &message).await?;
                }
                Err(e)
            }
        }
    }

    async fn ingest(&self, run: &SourceFetchRun) -> Result<FetchSummary, PipelineError> {
        let source = self.load_fetchable_source(run).await?;
        let adapter = self
            .adapters
            .get(&source.adapter_type)
            .ok_or_else(|| PipelineError::UnknownAdapter(source.adapter_type.clone()))?;

        let request = FetchRequest {
            since: source.last_success_at,
            limit: self.settings.fetch_limit,
        };
        let batch = match adapter.fetch(&source, request).await {
            Ok(batch) => batch,
            Err(e) => {
                self.store
                    .record_source_failure(source.id, Utc::now(), &e.to_string())
                    .await?;
                return Err(e.into());
            }
        };

        let now = Utc::now();
        let mut summary = FetchSummary::default();
        summary.counts.items_fetched = i32::try_from(batch.items.len()).unwrap_or(i32::MAX);

        for draft in &batch.items {
            let verdict = self
                .dedup
                .classify(source.org_id, source.id, draft, now)
                .await?;
            if verdict.is_duplicate() {
                tracing::debug!(source_id = %source.id, external_id = %draft.external_id, verdict = verdict.label(), "pipeline: duplicate skipped");
                summary.counts.items_duplicate += 1;
                continue;
            }

            let entities = self
                .extractor
                .extract(&draft.headline, &draft.content, source.sport);
            let new = NewNewsItem {
                org_id: source.org_id,
                source_id: source.id,
                external_id: draft.external_id.clone(),
                news_type: draft.news_type,
                sport: source.sport,
                headline: draft.headline.clone(),
                content: draft.content.clone(),
                url: draft.url.clone(),
                author: draft.author.clone(),
                published_at: draft.published_at,
                teams: entities.teams,
                players: entities.players,
                topics: entities.topics,
                content_fingerprint: content_fingerprint(&draft.headline, &draft.content),
            };

            // Score jobs go out per committed item: a later failure in this
            // attempt leaves the item stored, and a retry sees it as a duplicate.
            let (item, inserted) = self.store.insert_news_item(&new).await?;
            if inserted {
                summary.counts.items_new += 1;
                self.queue.enqueue(JobPayload::ImportanceScore {
                    news_item_id: item.id,
                    org_id: source.org_id,
                })?;
            } else {
                summary.counts.items_duplicate += 1;
            }
        }

        for odds in &batch.odds_snapshots {
            self.store
                .upsert_odds_snapshot(source.org_id, Some(source.id), source.sport, odds)
                .await?;
            summary.odds_upserted += 1;
        }
        for result in &batch.game_results {
            self.store
                .upsert_game_result(source.org_id, Some(source.id), source.sport, result)
                .await?;
            summary.results_upserted += 1;
        }

        self.store.record_source_success(source.id, now).await?;

        Ok(summary)
    }

    async fn load_fetchable_source(&self, run: &SourceFetchRun) -> Result<Source, PipelineError> {
        let source = self
            .store
            .get_source(run.source_id)
            .await?
            .ok_or(PipelineError::SourceNotFound(run.source_id))?;
        if source.org_id != run.org_id {
            return Err(PipelineError::OrgMismatch {
                expected: run.org_id,
                record: source.id,
            });
        }
        if source.status == SourceStatus::Paused {
            return Err(PipelineError::SourcePaused(source.id));
        }
        Ok(source)
    }

    // -- importance-score ----------------------------------------------------

    /// Scores an item as of now, stores the result, and queues clip pairing
    /// when the score clears the threshold.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NewsItemNotFound`] for unknown items, and
    /// store or queue errors otherwise.
    pub async fn score_item(
        &self,
        news_item_id: Uuid,
        org_id: Uuid,
    ) -> Result<ImportanceScore, PipelineError> {
        let item = self.load_item(news_item_id, org_id).await?;
        let now = Utc::now();

        let source_name = self
            .store
            .get_source(item.source_id)
            .await?
            .map(|s| s.name);
        let horizon = now + Duration::hours(self.settings.upcoming_game_horizon_hours);
        let games: Vec<UpcomingGame> = self
            .store
            .list_upcoming_games(org_id, now, horizon)
            .await?
            .iter()
            .map(UpcomingGame::from)
            .collect();

        let score = self.scorer.calculate(
            &ScoreSubject::from(&item),
            source_name.as_deref(),
            &games,
            now,
        );
        self.store
            .update_news_item_score(
                item.id,
                &ScoreUpdate {
                    importance_score: score.total_score,
                    breakdown: score.breakdown,
                    reasoning: score.reasoning.clone(),
                    scored_at: now,
                },
            )
            .await?;

        tracing::debug!(news_item_id = %item.id, score = score.total_score, "pipeline: item scored");

        if score.total_score >= self.settings.clip_pair_min_score {
            self.queue.enqueue(JobPayload::ClipPair {
                news_item_id: item.id,
                org_id,
            })?;
        }
        Ok(score)
    }

    // -- clip-pair -----------------------------------------------------------

    /// # Errors
    ///
    /// Returns [`PipelineError::NewsItemNotFound`] for unknown items, and
    /// finder or store errors otherwise.
    pub async fn pair_item(
        &self,
        news_item_id: Uuid,
        org_id: Uuid,
    ) -> Result<PairOutcome, PipelineError> {
        let item = self.load_item(news_item_id, org_id).await?;
        self.clips.pair(&item).await
    }

    async fn load_item(&self, news_item_id: Uuid, org_id: Uuid) -> Result<NewsItem, PipelineError> {
        let item = self
            .store
            .get_news_item(news_item_id)
            .await?
            .ok_or(PipelineError::NewsItemNotFound(news_item_id))?;
        if item.org_id != org_id {
            return Err(PipelineError::OrgMismatch {
                expected: org_id,
                record: item.id,
            });
        }
        Ok(item)
    }

    // -- scheduled-query -----------------------------------------------------

    /// Executes a saved query run and queues its export.
    ///
    /// Query runs stay `RUNNING` between retryable attempts and are only
    /// failed on the last one. A run that already succeeded has its export
    /// queued again and nothing else.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] describing why the attempt failed.
    pub async fn run_saved_query(
        &self,
        ctx: &JobContext,
        query_id: Uuid,
        query_run_id: Uuid,
        org_id: Uuid,
    ) -> Result<Vec<Uuid>, PipelineError> {
        let run = self.load_query_run(query_run_id, org_id).await?;
        if run.query_id != query_id {
            return Err(PipelineError::OrgMismatch {
                expected: org_id,
                record: run.id,
            });
        }

        match run.status {
            RunStatus::Queued => self.store.start_query_run(run.id).await?,
            RunStatus::Running => {}
            RunStatus::Succeeded => {
                self.enqueue_export(&run)?;
                return Ok(run.item_ids);
            }
            RunStatus::Failed => {
                tracing::warn!(query_run_id = %run.id, "pipeline: query run already failed, skipping");
                return Ok(Vec::new());
            }
        }

        match self.execute_query(&run).await {
            Ok(item_ids) => {
                self.store.complete_query_run(run.id, &item_ids).await?;
                tracing::info!(query_id = %query_id, query_run_id = %run.id, results = item_ids.len(), "pipeline: saved query complete");
                self.enqueue_export(&run)?;
                Ok(item_ids)
            }
            Err(e) => {
                if !e.is_retryable() || ctx.is_final_attempt() {
                    tracing::error!(query_run_id = %run.id, error = %e, "pipeline: saved query failed");
                    self.store.fail_query_run(run.id, &e.to_string()).await?;
                }
                Err(e)
            }
        }
    }

    async fn execute_query(&self, run: &QueryRun) -> Result<Vec<Uuid>, PipelineError> {
        let query = self
            .store
            .get_saved_query(run.query_id)
            .await?
            .ok_or(PipelineError::QueryNotFound(run.query_id))?;

        let search = NewsSearch {
            org_id: query.org_id,
            sport: query.sport,
            news_types: query.news_types.clone(),
            min_score: query.min_score,
            published_since: Utc::now() - Duration::hours(i64::from(query.lookback_hours)),
            limit: QUERY_RESULT_LIMIT,
        };
        let items = self.store.search_news_items(&search).await?;
        Ok(items.into_iter().map(|i| i.id).collect())
    }

    fn enqueue_export(&self, run: &QueryRun) -> Result<(), PipelineError> {
        self.queue.enqueue(JobPayload::Export {
            query_run_id: run.id,
            org_id: run.org_id,
        })?;
        Ok(())
    }

    async fn load_query_run(&self, query_run_id: Uuid, org_id: Uuid) -> Result<QueryRun, PipelineError> {
        let run = self
            .store
            .get_query_run(query_run_id)
            .await?
            .ok_or(PipelineError::QueryRunNotFound(query_run_id))?;
        if run.org_id != org_id {
            return Err(PipelineError::OrgMismatch {
                expected: org_id,
                record: run.id,
            });
        }
        Ok(run)
    }

    // -- export --------------------------------------------------------------

    /// Hands a succeeded query run's items to the export sink.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::QueryRunNotReady`] unless the run succeeded,
    /// and store or sink errors otherwise.
    pub async fn export_query_run(
        &self,
        query_run_id: Uuid,
        org_id: Uuid,
    ) -> Result<ExportDocument, PipelineError> {
        let run = self.load_query_run(query_run_id, org_id).await?;
        if run.status != RunStatus::Succeeded {
            return Err(PipelineError::QueryRunNotReady(run.id));
        }
        let query = self
            .store
            .get_saved_query(run.query_id)
            .await?
            .ok_or(PipelineError::QueryNotFound(run.query_id))?;

        let items = self.store.get_news_items(&run.item_ids).await?;
        let document = ExportDocument {
            query_id: query.id,
            query_run_id: run.id,
            org_id: run.org_id,
            query_name: query.name,
            generated_at: Utc::now(),
            items,
        };
        self.export.export(&document).await?;
        Ok(document)
    }
}
