use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use scoreline_pipeline::MergeReport;
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct MergeQuery {
    pub dry_run: Option<bool>,
}

pub(super) async fn merge_duplicates(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(org_id): Path<Uuid>,
    Query(query): Query<MergeQuery>,
) -> Result<Json<ApiResponse<MergeReport>>, ApiError> {
    let dry_run = query.dry_run.unwrap_or(false);
    let report = state
        .dedup
        .merge_duplicates(org_id, dry_run, Utc::now())
        .await
        .map_err(|e| ApiError::internal(req_id.0.clone(), &e))?;

    tracing::info!(
        org_id = %org_id,
        dry_run,
        groups = report.duplicate_groups,
        merged = report.items_merged,
        "api: duplicate merge finished"
    );

    Ok(ApiResponse::json(req_id, report))
}
