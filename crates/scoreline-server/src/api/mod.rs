//! HTTP surface: the public health and cron routes, and the key-protected
//! `/api/v1` operator routes.

mod cron;
mod dedup;
mod jobs;
mod sources;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use scoreline_db::SharedStore;
use scoreline_jobs::JobQueue;
use scoreline_pipeline::{DedupEngine, PipelineError};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{request_id, require_bearer_auth, AuthState, CronSecret, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub queue: JobQueue,
    pub dedup: DedupEngine,
    pub cron_secret: CronSecret,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

impl ResponseMeta {
    fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

/// Success envelope: `{ "data": .., "meta": { request_id, timestamp } }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn json(request_id: RequestId, data: T) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id.0),
        })
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
    meta: ResponseMeta,
}

/// Error envelope: `{ "error": { code, message }, "meta": .. }` with the
/// status its code implies.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    envelope: ErrorEnvelope,
}

impl ApiError {
    fn new(
        status: StatusCode,
        code: &'static str,
        request_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            envelope: ErrorEnvelope {
                error: ErrorBody {
                    code,
                    message: message.into(),
                },
                meta: ResponseMeta::new(request_id.into()),
            },
        }
    }

    pub fn not_found(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", request_id, message)
    }

    pub fn conflict(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "conflict", request_id, message)
    }

    pub fn unauthorized(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", request_id, message)
    }

    /// Details go to the log, not the client.
    pub fn internal(request_id: impl Into<String>, error: &dyn std::fmt::Display) -> Self {
        tracing::error!(error = %error, "api: request failed");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            request_id,
            "request failed",
        )
    }

    pub fn from_pipeline(request_id: impl Into<String>, error: &PipelineError) -> Self {
        match error {
            PipelineError::SourceNotFound(_) | PipelineError::QueryNotFound(_) => {
                Self::not_found(request_id, error.to_string())
            }
            PipelineError::SourcePaused(_) => Self::conflict(request_id, error.to_string()),
            _ => Self::internal(request_id, error),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn operator_routes(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/sources/{source_id}/runs",
            get(sources::list_fetch_runs),
        )
        .route(
            "/api/v1/sources/{source_id}/fetch",
            post(sources::trigger_fetch),
        )
        .route("/api/v1/jobs/{job_id}", get(jobs::get_job))
        .route(
            "/api/v1/orgs/{org_id}/dedup/merge",
            post(dedup::merge_duplicates),
        )
        .layer(axum::middleware::from_fn_with_state(
            auth,
            require_bearer_auth,
        ))
}

pub fn build_app(state: AppState, auth: AuthState) -> Router {
    // Cron routes check the cron secret themselves.
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/cron/{scheduler}", get(cron::run_scheduler));

    Router::new()
        .merge(public_routes)
        .merge(operator_routes(auth))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
    active_jobs: usize,
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let active_jobs = state
        .queue
        .records()
        .iter()
        .filter(|r| !r.state.is_terminal())
        .count();

    let (status, data) = match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            HealthData {
                status: "ok",
                database: "ok",
                active_jobs,
            },
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                HealthData {
                    status: "degraded",
                    database: "unavailable",
                    active_jobs,
                },
            )
        }
    };
    (status, ApiResponse::json(req_id, data))
}

#[cfg(test)]
mod tests;
