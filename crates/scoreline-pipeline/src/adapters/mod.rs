//! Source adapters: the boundary between external feeds and the pipeline.
//!
//! Each [`Source`] names its adapter by `adapter_type`; the
//! [`AdapterRegistry`] resolves that tag at job start.

mod rss;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scoreline_core::{GameResultDraft, NewsItemDraft, OddsDraft, Source};
use thiserror::Error;

pub use rss::{infer_news_type, parse_feed, RssAdapter};

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("feed parse error: {0}")]
    Parse(String),

    #[error("invalid adapter config: {0}")]
    Config(String),
}

impl AdapterError {
    /// Network failures, 5xx/429 responses, and unparseable bodies are
    /// worth another attempt. Bad source configuration is not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            AdapterError::Http(_) | AdapterError::Parse(_) => true,
            AdapterError::Status { status, .. } => *status >= 500 || *status == 429,
            AdapterError::Config(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    /// Only items published after this instant. `None` on a source's first fetch.
    pub since: Option<DateTime<Utc>>,
    pub limit: usize,
}

/// Everything one fetch produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchBatch {
    pub items: Vec<NewsItemDraft>,
    pub odds_snapshots: Vec<OddsDraft>,
    pub game_results: Vec<GameResultDraft>,
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// The `adapter_type` tag this adapter serves.
    fn adapter_type(&self) -> &str;

    /// # Errors
    ///
    /// Returns [`AdapterError`] when the feed cannot be fetched or parsed.
    async fn fetch(&self, source: &Source, request: FetchRequest)
        -> Result<FetchBatch, AdapterError>;
}

#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn SourceAdapter>>,
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("types", &self.types())
            .finish()
    }
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `adapter` under its own type tag, replacing any previous one.
    #[must_use]
    pub fn with(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters
            .insert(adapter.adapter_type().to_string(), adapter);
    }

    #[must_use]
    pub fn get(&self, adapter_type: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(adapter_type).cloned()
    }

    /// Registered tags, sorted.
    #[must_use]
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}
