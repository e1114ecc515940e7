//! Delivery of saved-query results.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scoreline_core::NewsItem;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("export serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One query run's results, ordered as the query returned them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub query_id: Uuid,
    pub query_run_id: Uuid,
    pub org_id: Uuid,
    pub query_name: String,
    pub generated_at: DateTime<Utc>,
    pub items: Vec<NewsItem>,
}

#[async_trait]
pub trait ExportSink: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ExportError`] when the document cannot be delivered.
    async fn export(&self, document: &ExportDocument) -> Result<(), ExportError>;
}

/// Writes `<dir>/<query_run_id>.json`, creating `dir` on first use.
/// Re-exporting a run overwrites its file.
#[derive(Debug, Clone)]
pub struct JsonFileExportSink {
    dir: PathBuf,
}

impl JsonFileExportSink {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn path_for(&self, query_run_id: Uuid) -> PathBuf {
        self.dir.join(format!("{query_run_id}.json"))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ExportSink for JsonFileExportSink {
    async fn export(&self, document: &ExportDocument) -> Result<(), ExportError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| ExportError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let body = serde_json::to_vec_pretty(document)?;
        let path = self.path_for(document.query_run_id);
        tokio::fs::write(&path, body)
            .await
            .map_err(|source| ExportError::Io {
                path: path.clone(),
                source,
            })?;

        tracing::info!(
            query_run_id = %document.query_run_id,
            items = document.items.len(),
            path = %path.display(),
            "export: wrote query results"
        );
        Ok(())
    }
}
