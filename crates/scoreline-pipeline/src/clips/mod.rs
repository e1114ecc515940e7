//! Pairing news items with video clip candidates.
//!
//! A [`ClipFinder`] proposes candidates; [`ClipPairer`] persists them as
//! clip matches keyed by `(news_item_id, candidate_id)` and flags the item
//! as paired once any match exists.

mod embeddings;
mod vector_store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scoreline_core::{AppConfig, ClipMatch, NewsItem};
use scoreline_db::SharedStore;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::error::PipelineError;
use embeddings::TeiEmbedder;
use vector_store::QdrantClient;

/// Candidates requested per search.
const SEARCH_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum ClipError {
    #[error("TEI error: {0}")]
    Tei(String),

    #[error("Qdrant error: {0}")]
    Qdrant(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipCandidate {
    pub candidate_id: Uuid,
    pub score: f64,
    pub reason: String,
}

#[async_trait]
pub trait ClipFinder: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ClipError`] when the candidate provider is unavailable.
    async fn find_clips_for_news(&self, item: &NewsItem) -> Result<Vec<ClipCandidate>, ClipError>;
}

/// Finder that never proposes anything. Used when no vector services are
/// configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClipFinder;

#[async_trait]
impl ClipFinder for NoClipFinder {
    async fn find_clips_for_news(&self, _item: &NewsItem) -> Result<Vec<ClipCandidate>, ClipError> {
        Ok(Vec::new())
    }
}

/// Embeds the headline and entities with TEI and searches a Qdrant
/// collection of clips.
#[derive(Debug, Clone)]
pub struct TeiQdrantClipFinder {
    embedder: TeiEmbedder,
    qdrant: QdrantClient,
    min_score: f64,
}

impl TeiQdrantClipFinder {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        tei_url: &str,
        qdrant_url: &str,
        collection: &str,
        min_score: f64,
    ) -> Self {
        Self {
            embedder: TeiEmbedder::new(client.clone(), tei_url),
            qdrant: QdrantClient::new(client, qdrant_url, collection),
            min_score,
        }
    }

    /// `None` unless both `tei_url` and `qdrant_url` are configured.
    ///
    /// # Errors
    ///
    /// Returns [`ClipError::Tei`] if the HTTP client cannot be built.
    pub fn from_app_config(config: &AppConfig) -> Result<Option<Self>, ClipError> {
        let (Some(tei_url), Some(qdrant_url)) = (&config.tei_url, &config.qdrant_url) else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.adapter_request_timeout_secs))
            .build()
            .map_err(|e| ClipError::Tei(format!("client build failed: {e}")))?;
        Ok(Some(Self::new(
            client,
            tei_url,
            qdrant_url,
            &config.qdrant_collection,
            config.clip_min_similarity,
        )))
    }
}

#[async_trait]
impl ClipFinder for TeiQdrantClipFinder {
    async fn find_clips_for_news(&self, item: &NewsItem) -> Result<Vec<ClipCandidate>, ClipError> {
        let vector = self.embedder.embed_item(item).await?;
        self.qdrant
            .search(item.org_id, &vector, SEARCH_LIMIT, self.min_score)
            .await
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairOutcome {
    pub matches: Vec<ClipMatch>,
    pub paired: bool,
}

#[derive(Clone)]
pub struct ClipPairer {
    store: SharedStore,
    finder: Arc<dyn ClipFinder>,
}

impl ClipPairer {
    #[must_use]
    pub fn new(store: SharedStore, finder: Arc<dyn ClipFinder>) -> Self {
        Self { store, finder }
    }

    /// Upserts every proposed candidate, then marks the item paired when it
    /// has at least one match (including matches from earlier runs).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Clip`] if the finder fails and
    /// [`PipelineError::Db`] if the store does.
    pub async fn pair(&self, item: &NewsItem) -> Result<PairOutcome, PipelineError> {
        let candidates = self.finder.find_clips_for_news(item).await?;

        for candidate in &candidates {
            self.store
                .upsert_clip_match(
                    item.id,
                    candidate.candidate_id,
                    candidate.score,
                    &candidate.reason,
                )
                .await?;
        }

        let matches = self.store.list_clip_matches(item.id).await?;
        let paired = !matches.is_empty();
        if paired && !item.paired {
            self.store.set_news_item_paired(item.id, true).await?;
        }

        tracing::debug!(
            news_item_id = %item.id,
            candidates = candidates.len(),
            matches = matches.len(),
            "clips: pairing complete"
        );

        Ok(PairOutcome { matches, paired })
    }
}
