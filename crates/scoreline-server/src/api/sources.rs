use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use scoreline_core::SourceFetchRun;
use scoreline_pipeline::{trigger_source_fetch, TriggerOutcome, TRIGGER_MANUAL};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct FetchRunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct QueuedFetch {
    fetch_run_id: Uuid,
    job_id: Uuid,
}

/// Most recent fetch runs for a source, newest first.
pub(super) async fn list_fetch_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(source_id): Path<Uuid>,
    Query(query): Query<FetchRunsQuery>,
) -> Result<Json<ApiResponse<Vec<SourceFetchRun>>>, ApiError> {
    let internal = |e: scoreline_db::DbError| ApiError::internal(req_id.0.clone(), &e);

    if state.store.get_source(source_id).await.map_err(internal)?.is_none() {
        return Err(ApiError::not_found(
            req_id.0,
            format!("source {source_id} not found"),
        ));
    }

    let runs = state
        .store
        .list_fetch_runs(source_id, normalize_limit(query.limit))
        .await
        .map_err(internal)?;
    Ok(ApiResponse::json(req_id, runs))
}

/// Manual fetch. Responds 202 with the queued run, or 409 while another
/// run for the source is queued or running.
pub(super) async fn trigger_fetch(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(source_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome =
        trigger_source_fetch(state.store.as_ref(), &state.queue, source_id, TRIGGER_MANUAL)
            .await
            .map_err(|e| ApiError::from_pipeline(req_id.0.clone(), &e))?;

    match outcome {
        TriggerOutcome::Queued { run_id, job_id } => Ok((
            StatusCode::ACCEPTED,
            ApiResponse::json(
                req_id,
                QueuedFetch {
                    fetch_run_id: run_id,
                    job_id,
                },
            ),
        )),
        TriggerOutcome::AlreadyRunning => Err(ApiError::conflict(
            req_id.0,
            format!("a fetch run is already active for source {source_id}"),
        )),
    }
}
