use axum::{
    extract::{Path, State},
    Extension, Json,
};
use scoreline_jobs::JobRecord;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

/// Job records are in-process; pruned or pre-restart jobs are 404.
pub(super) async fn get_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ApiResponse<JobRecord>>, ApiError> {
    match state.queue.get(job_id) {
        Some(record) => Ok(ApiResponse::json(req_id, record)),
        None => Err(ApiError::not_found(req_id.0, format!("job {job_id} not found"))),
    }
}
