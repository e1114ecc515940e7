//! `GET /cron/{scheduler}`: runs one scheduler tick on behalf of an
//! external cron service.

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use scoreline_pipeline::{tick_queries, tick_sources};
use serde::Serialize;

use super::AppState;

const SOURCE_FETCH: &str = "source-fetch";
const SCHEDULED_QUERIES: &str = "scheduled-queries";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CronSuccess {
    success: bool,
    processed_count: usize,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct CronFailure {
    success: bool,
    error: String,
}

fn failure(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(CronFailure {
            success: false,
            error: error.into(),
        }),
    )
        .into_response()
}

pub(super) async fn run_scheduler(
    State(state): State<AppState>,
    Path(scheduler): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !state.cron_secret.is_configured() {
        tracing::error!("cron: SCORELINE_CRON_SECRET is not configured");
        return failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            "cron secret is not configured",
        );
    }
    if !state.cron_secret.verify(headers.get(AUTHORIZATION)) {
        return failure(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let now = Utc::now();
    let result = match scheduler.as_str() {
        SOURCE_FETCH => tick_sources(state.store.as_ref(), &state.queue, now).await,
        SCHEDULED_QUERIES => tick_queries(state.store.as_ref(), &state.queue, now).await,
        other => {
            return failure(
                StatusCode::NOT_FOUND,
                format!("unknown scheduler: {other}"),
            );
        }
    };

    match result {
        Ok(report) => {
            tracing::info!(
                scheduler = %scheduler,
                processed = report.enqueued,
                "cron: tick complete"
            );
            Json(CronSuccess {
                success: true,
                processed_count: report.enqueued,
                timestamp: Utc::now(),
            })
            .into_response()
        }
        Err(e) => {
            tracing::error!(scheduler = %scheduler, error = %e, "cron: tick failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
