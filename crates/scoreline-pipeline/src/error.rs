use scoreline_core::ConfigError;
use scoreline_db::DbError;
use scoreline_jobs::{JobError, QueueError};
use thiserror::Error;
use uuid::Uuid;

use crate::adapters::AdapterError;
use crate::clips::ClipError;
use crate::export::ExportError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no adapter registered for type '{0}'")]
    UnknownAdapter(String),

    #[error("source {0} not found")]
    SourceNotFound(Uuid),

    #[error("source {0} is paused")]
    SourcePaused(Uuid),

    #[error("fetch run {0} not found")]
    FetchRunNotFound(Uuid),

    #[error("news item {0} not found")]
    NewsItemNotFound(Uuid),

    #[error("saved query {0} not found")]
    QueryNotFound(Uuid),

    #[error("query run {0} not found")]
    QueryRunNotFound(Uuid),

    #[error("query run {0} has not succeeded")]
    QueryRunNotReady(Uuid),

    #[error("job org {expected} does not own record {record}")]
    OrgMismatch { expected: Uuid, record: Uuid },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("clip finder error: {0}")]
    Clip(#[from] ClipError),

    #[error("export error: {0}")]
    Export(#[from] ExportError),

    #[error("store error: {0}")]
    Db(#[from] DbError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}

impl PipelineError {
    /// `true` when another attempt could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Adapter(e) => e.is_retryable(),
            PipelineError::Db(e) => matches!(e, DbError::Sqlx(_) | DbError::Migration(_)),
            PipelineError::Clip(_) | PipelineError::Export(_) | PipelineError::Queue(_) => true,
            PipelineError::Config(_)
            | PipelineError::UnknownAdapter(_)
            | PipelineError::SourceNotFound(_)
            | PipelineError::SourcePaused(_)
            | PipelineError::FetchRunNotFound(_)
            | PipelineError::NewsItemNotFound(_)
            | PipelineError::QueryNotFound(_)
            | PipelineError::QueryRunNotFound(_)
            | PipelineError::QueryRunNotReady(_)
            | PipelineError::OrgMismatch { .. } => false,
        }
    }

    #[must_use]
    pub fn into_job_error(self) -> JobError {
        if self.is_retryable() {
            JobError::Retryable(self.to_string())
        } else {
            JobError::Fatal(self.to_string())
        }
    }
}
