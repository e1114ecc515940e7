use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::response::Response;
use scoreline_core::{SourceStatus, Sport};
use scoreline_db::{MemoryStore, NewSource, Store};
use scoreline_jobs::QueueConfig;
use scoreline_pipeline::DedupPolicy;
use tower::ServiceExt;
use uuid::Uuid;

use super::*;

const CRON_TOKEN: &str = "cron-token";

struct TestApp {
    store: Arc<MemoryStore>,
    router: Router,
}

/// The queue is never started, so queued jobs and runs stay put.
fn test_app(auth: AuthState) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let state = AppState {
        store: store.clone(),
        queue: JobQueue::new(QueueConfig::default()),
        dedup: DedupEngine::new(store.clone(), DedupPolicy::default()),
        cron_secret: CronSecret::new(Some(CRON_TOKEN)),
    };
    TestApp {
        store,
        router: build_app(state, auth),
    }
}

fn open_app() -> TestApp {
    test_app(AuthState::from_raw("", true).expect("auth"))
}

async fn add_source(store: &MemoryStore, status: SourceStatus) -> Uuid {
    let mut new = NewSource::new(Uuid::new_v4(), "League Wire", "rss", Sport::Nfl);
    new.status = status;
    store.insert_source(&new).await.expect("insert source").id
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.expect("response")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn cron(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request")
}

async fn json_body(response: Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json parse")
}

#[test]
fn normalize_limit_applies_defaults_and_bounds() {
    assert_eq!(normalize_limit(None), 50);
    assert_eq!(normalize_limit(Some(0)), 1);
    assert_eq!(normalize_limit(Some(1_000)), 200);
    assert_eq!(normalize_limit(Some(25)), 25);
}

#[test]
fn api_error_conflict_maps_to_409() {
    let response = ApiError::conflict("req-1", "busy").into_response();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn health_reports_ok_with_reachable_store() {
    let app = open_app();
    let response = send(&app.router, get("/api/v1/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let json = json_body(response).await;
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["active_jobs"], 0);
}

#[tokio::test]
async fn cron_rejects_missing_or_wrong_secret() {
    let app = open_app();

    let response = send(&app.router, get("/cron/source-fetch")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Unauthorized");

    let response = send(&app.router, cron("/cron/source-fetch", "nope")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cron_without_configured_secret_is_a_server_error() {
    let store = Arc::new(MemoryStore::new());
    let state = AppState {
        store: store.clone(),
        queue: JobQueue::new(QueueConfig::default()),
        dedup: DedupEngine::new(store, DedupPolicy::default()),
        cron_secret: CronSecret::new(None),
    };
    let router = build_app(state, AuthState::from_raw("", true).expect("auth"));

    let response = send(&router, cron("/cron/source-fetch", CRON_TOKEN)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["success"], false);
}

#[tokio::test]
async fn cron_unknown_scheduler_is_404() {
    let app = open_app();
    let response = send(&app.router, cron("/cron/rebuild-index", CRON_TOKEN)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "unknown scheduler: rebuild-index");
}

#[tokio::test]
async fn cron_source_tick_reports_processed_count() {
    let app = open_app();
    add_source(&app.store, SourceStatus::Active).await;
    add_source(&app.store, SourceStatus::Active).await;
    add_source(&app.store, SourceStatus::Paused).await;

    let response = send(&app.router, cron("/cron/source-fetch", CRON_TOKEN)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["processedCount"], 2);
    assert!(json["timestamp"].is_string());

    // Schedules advanced an hour, so nothing is due on the next call.
    let response = send(&app.router, cron("/cron/source-fetch", CRON_TOKEN)).await;
    assert_eq!(json_body(response).await["processedCount"], 0);
}

#[tokio::test]
async fn cron_query_tick_with_nothing_due() {
    let app = open_app();
    let response = send(&app.router, cron("/cron/scheduled-queries", CRON_TOKEN)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["processedCount"], 0);
}

#[tokio::test]
async fn manual_fetch_queues_once_then_conflicts() {
    let app = open_app();
    let source_id = add_source(&app.store, SourceStatus::Active).await;
    let uri = format!("/api/v1/sources/{source_id}/fetch");

    let response = send(&app.router, post(&uri)).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let queued = json_body(response).await;
    let job_id = queued["data"]["job_id"].as_str().expect("job id").to_string();

    let response = send(&app.router, post(&uri)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["error"]["code"], "conflict");

    let response = send(&app.router, get(&format!("/api/v1/sources/{source_id}/runs"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let runs = json_body(response).await;
    let runs = runs["data"].as_array().expect("runs array");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["status"], "QUEUED");
    assert_eq!(runs[0]["triggered_by"], "manual");
    assert_eq!(runs[0]["id"], queued["data"]["fetch_run_id"]);

    let response = send(&app.router, get(&format!("/api/v1/jobs/{job_id}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let job = json_body(response).await;
    assert_eq!(job["data"]["kind"], "source-fetch");
    assert_eq!(job["data"]["state"], "QUEUED");
    assert_eq!(job["data"]["payload"]["source_id"], source_id.to_string());
}

#[tokio::test]
async fn manual_fetch_of_missing_or_paused_source_is_rejected() {
    let app = open_app();

    let missing = format!("/api/v1/sources/{}/fetch", Uuid::new_v4());
    let response = send(&app.router, post(&missing)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let paused = add_source(&app.store, SourceStatus::Paused).await;
    let response = send(&app.router, post(&format!("/api/v1/sources/{paused}/fetch"))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(app.store.fetch_runs().is_empty());
}

#[tokio::test]
async fn runs_of_unknown_source_is_404() {
    let app = open_app();
    let uri = format!("/api/v1/sources/{}/runs", Uuid::new_v4());
    let response = send(&app.router, get(&uri)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_job_is_404() {
    let app = open_app();
    let uri = format!("/api/v1/jobs/{}", Uuid::new_v4());
    let response = send(&app.router, get(&uri)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dry_run_merge_returns_report() {
    let app = open_app();
    let uri = format!("/api/v1/orgs/{}/dedup/merge?dry_run=true", Uuid::new_v4());
    let response = send(&app.router, post(&uri)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["dryRun"], true);
    assert_eq!(json["data"]["duplicateGroups"], 0);
    assert_eq!(json["data"]["itemsMerged"], 0);
}

#[tokio::test]
async fn protected_routes_require_api_key_when_enabled() {
    let app = test_app(AuthState::from_raw("ops-key", false).expect("auth"));
    let uri = format!("/api/v1/jobs/{}", Uuid::new_v4());

    let response = send(&app.router, get(&uri)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri(&uri)
        .header("authorization", "Bearer ops-key")
        .body(Body::empty())
        .expect("request");
    let response = send(&app.router, request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Health stays public.
    let response = send(&app.router, get("/api/v1/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
}
