//! Live integration tests for scoreline-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/scoreline-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory. Run with `cargo test -- --ignored` and `DATABASE_URL`
//! pointing at a server the harness may create databases on.

use chrono::{Duration, Utc};
use scoreline_core::{ClipMatchStatus, NewsType, RunStatus, Sport};
use scoreline_db::{
    DbError, FetchCounts, NewNewsItem, NewSavedQuery, NewSource, PgStore, Store,
};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn news(org_id: Uuid, source_id: Uuid, external_id: &str) -> NewNewsItem {
    NewNewsItem {
        org_id,
        source_id,
        external_id: external_id.to_string(),
        news_type: NewsType::Trade,
        sport: Sport::Nba,
        headline: format!("Headline {external_id}"),
        content: "Body".to_string(),
        url: Some(format!("https://example.com/{external_id}")),
        author: None,
        published_at: Utc::now(),
        teams: vec!["Boston Celtics".to_string()],
        players: vec!["Jayson Tatum".to_string()],
        topics: vec!["trade".to_string()],
        content_fingerprint: "abc123".to_string(),
    }
}

async fn seeded_source(store: &PgStore) -> scoreline_core::Source {
    store
        .insert_source(&NewSource::new(Uuid::new_v4(), "wire", "rss", Sport::Nba))
        .await
        .expect("insert_source failed")
}

// ---------------------------------------------------------------------------
// Section 1: Fetch run lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn fetch_run_lifecycle_queued_to_succeeded(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let source = seeded_source(&store).await;

    let run = store
        .create_fetch_run_if_idle(&source, "cron")
        .await
        .expect("create failed")
        .expect("idle source must get a run");
    assert_eq!(run.status, RunStatus::Queued);

    store.start_fetch_run(run.id).await.expect("start failed");
    store
        .complete_fetch_run(
            run.id,
            FetchCounts {
                items_fetched: 4,
                items_new: 3,
                items_duplicate: 1,
            },
        )
        .await
        .expect("complete failed");

    let run = store
        .get_fetch_run(run.id)
        .await
        .expect("get failed")
        .expect("run exists");
    assert_eq!(run.status, RunStatus::Succeeded);
    assert_eq!(run.items_duplicate, 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn active_run_blocks_a_second_one(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let source = seeded_source(&store).await;

    let first = store
        .create_fetch_run_if_idle(&source, "cron")
        .await
        .expect("create failed")
        .expect("first run");
    let second = store
        .create_fetch_run_if_idle(&source, "manual")
        .await
        .expect("create failed");
    assert!(second.is_none());

    store.fail_fetch_run(first.id, "boom").await.expect("fail failed");
    let third = store
        .create_fetch_run_if_idle(&source, "manual")
        .await
        .expect("create failed");
    assert!(third.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn completing_a_queued_run_is_rejected(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let source = seeded_source(&store).await;
    let run = store
        .create_fetch_run_if_idle(&source, "cron")
        .await
        .expect("create failed")
        .expect("run");

    let err = store
        .complete_fetch_run(run.id, FetchCounts::default())
        .await
        .expect_err("queued run must not complete");
    assert!(matches!(err, DbError::InvalidTransition { .. }));
}

// ---------------------------------------------------------------------------
// Section 2: News items and clips
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn news_insert_is_idempotent(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let seeded = seeded_source(&store).await;
    let (org, source) = (seeded.org_id, seeded.id);

    let (first, inserted) = store
        .insert_news_item(&news(org, source, "n-1"))
        .await
        .expect("insert failed");
    assert!(inserted);

    let (again, inserted) = store
        .insert_news_item(&news(org, source, "n-1"))
        .await
        .expect("insert failed");
    assert!(!inserted);
    assert_eq!(again.id, first.id);
    assert_eq!(again.teams, vec!["Boston Celtics".to_string()]);

    let by_fp = store
        .find_news_item_by_fingerprint(org, "abc123", Utc::now() - Duration::hours(1))
        .await
        .expect("lookup failed")
        .expect("fingerprint match");
    assert_eq!(by_fp.id, first.id);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn clip_upsert_keeps_editorial_status(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let source = seeded_source(&store).await;
    let (item, _) = store
        .insert_news_item(&news(source.org_id, source.id, "c-1"))
        .await
        .expect("insert failed");
    let candidate = Uuid::new_v4();

    let clip = store
        .upsert_clip_match(item.id, candidate, 0.8, "semantic")
        .await
        .expect("upsert failed");
    store
        .set_clip_match_status(clip.id, ClipMatchStatus::Rejected)
        .await
        .expect("status failed");
    let again = store
        .upsert_clip_match(item.id, candidate, 0.85, "semantic")
        .await
        .expect("upsert failed");

    assert_eq!(again.id, clip.id);
    assert_eq!(again.status, ClipMatchStatus::Rejected);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn merge_reassigns_clips_and_deletes_duplicates(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let seeded = seeded_source(&store).await;
    let (org, source) = (seeded.org_id, seeded.id);
    let (primary, _) = store
        .insert_news_item(&news(org, source, "p"))
        .await
        .expect("insert failed");
    let (dup, _) = store
        .insert_news_item(&news(org, source, "d"))
        .await
        .expect("insert failed");

    let shared = Uuid::new_v4();
    store
        .upsert_clip_match(primary.id, shared, 0.9, "x")
        .await
        .expect("upsert failed");
    store
        .upsert_clip_match(dup.id, shared, 0.7, "x")
        .await
        .expect("upsert failed");
    store
        .upsert_clip_match(dup.id, Uuid::new_v4(), 0.7, "x")
        .await
        .expect("upsert failed");

    let outcome = store
        .merge_news_items(org, primary.id, &[dup.id])
        .await
        .expect("merge failed");
    assert_eq!(outcome.items_deleted, 1);
    assert_eq!(outcome.clips_reassigned, 1);
    assert_eq!(outcome.clips_dropped, 1);

    let clips = store
        .list_clip_matches(primary.id)
        .await
        .expect("list failed");
    assert_eq!(clips.len(), 2);
    assert!(store
        .get_news_item(dup.id)
        .await
        .expect("get failed")
        .is_none());
}

// ---------------------------------------------------------------------------
// Section 3: Saved queries
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn query_run_lifecycle_and_stale_recovery(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let query = store
        .insert_saved_query(&NewSavedQuery::new(Uuid::new_v4(), "digest"))
        .await
        .expect("insert failed");

    let run = store
        .create_query_run_if_idle(&query, "cron")
        .await
        .expect("create failed")
        .expect("run");
    let recovered = store
        .fail_stale_runs(Utc::now() + Duration::minutes(1), "restart")
        .await
        .expect("stale sweep failed");
    assert_eq!(recovered, 1);

    let run = store
        .get_query_run(run.id)
        .await
        .expect("get failed")
        .expect("run");
    assert_eq!(run.status, RunStatus::Failed);
}
