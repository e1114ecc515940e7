use async_trait::async_trait;
use scoreline_jobs::{JobContext, JobError, JobHandler, JobPayload};

use crate::pipeline::Pipeline;

#[async_trait]
impl JobHandler for Pipeline {
    async fn handle(&self, ctx: &JobContext, payload: &JobPayload) -> Result<(), JobError> {
        let result = match *payload {
            JobPayload::SourceFetch {
                source_id,
                fetch_run_id,
                org_id,
                ..
            } => self
                .run_source_fetch(ctx, source_id, fetch_run_id, org_id)
                .await
                .map(drop),
            JobPayload::ImportanceScore {
                news_item_id,
                org_id,
            } => self.score_item(news_item_id, org_id).await.map(drop),
            JobPayload::ClipPair {
                news_item_id,
                org_id,
            } => self.pair_item(news_item_id, org_id).await.map(drop),
            JobPayload::ScheduledQuery {
                query_id,
                query_run_id,
                org_id,
            } => self
                .run_saved_query(ctx, query_id, query_run_id, org_id)
                .await
                .map(drop),
            JobPayload::Export {
                query_run_id,
                org_id,
            } => self.export_query_run(query_run_id, org_id).await.map(drop),
        };

        result.map_err(|e| {
            tracing::warn!(job_id = %ctx.job_id, kind = %ctx.kind, attempt = ctx.attempt, error = %e, "pipeline: job attempt failed");
            e.into_job_error()
        })
    }
}
