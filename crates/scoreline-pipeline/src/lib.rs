//! The ingestion pipeline: adapters feed the dedup engine, survivors are
//! persisted and scored, and high scorers are paired with video clips.
//! Every stage runs as a job on the [`scoreline_jobs::JobQueue`] and hands
//! off to the next stage only after its own writes have committed.

pub mod adapters;
pub mod clips;
pub mod dedup;
pub mod error;
pub mod export;
mod handler;
pub mod pipeline;
pub mod schedule;
pub mod scheduler;

pub use adapters::{
    AdapterError, AdapterRegistry, FetchBatch, FetchRequest, RssAdapter, SourceAdapter,
};
pub use clips::{
    ClipCandidate, ClipError, ClipFinder, ClipPairer, NoClipFinder, PairOutcome,
    TeiQdrantClipFinder,
};
pub use dedup::{DedupEngine, DedupPolicy, DedupVerdict, MergeReport, SimilarItem};
pub use error::PipelineError;
pub use export::{ExportDocument, ExportError, ExportSink, JsonFileExportSink};
pub use pipeline::{FetchSummary, Pipeline, PipelineSettings};
pub use schedule::compute_next_run;
pub use scheduler::{
    tick_queries, tick_sources, trigger_saved_query, trigger_source_fetch, TickReport,
    TriggerOutcome, TRIGGER_CRON, TRIGGER_MANUAL,
};
