//! Duplicate detection and merging against the in-process store.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use scoreline_core::{NewsItem, NewsItemDraft, NewsType, Source, Sport};
use scoreline_db::{MemoryStore, NewNewsItem, NewSource, Store};
use scoreline_intel::content_fingerprint;
use scoreline_pipeline::{DedupEngine, DedupPolicy, DedupVerdict};
use uuid::Uuid;

const HEADLINE: &str = "Chiefs quarterback Mahomes ruled doubtful with ankle injury";

struct Fixture {
    store: Arc<MemoryStore>,
    engine: DedupEngine,
    source: Source,
}

async fn fixture(policy: DedupPolicy) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let source = store
        .insert_source(&NewSource::new(Uuid::new_v4(), "wire", "rss", Sport::Nfl))
        .await
        .unwrap();
    let engine = DedupEngine::new(store.clone(), policy);
    Fixture {
        store,
        engine,
        source,
    }
}

impl Fixture {
    async fn insert(
        &self,
        external_id: &str,
        headline: &str,
        content: &str,
        published_at: DateTime<Utc>,
    ) -> NewsItem {
        let (item, inserted) = self
            .store
            .insert_news_item(&NewNewsItem {
                org_id: self.source.org_id,
                source_id: self.source.id,
                external_id: external_id.to_string(),
                news_type: NewsType::Injury,
                sport: Sport::Nfl,
                headline: headline.to_string(),
                content: content.to_string(),
                url: None,
                author: None,
                published_at,
                teams: vec![],
                players: vec![],
                topics: vec![],
                content_fingerprint: content_fingerprint(headline, content),
            })
            .await
            .unwrap();
        assert!(inserted);
        item
    }
}

fn draft(external_id: &str, headline: &str, content: &str) -> NewsItemDraft {
    NewsItemDraft {
        external_id: external_id.to_string(),
        news_type: NewsType::Injury,
        headline: headline.to_string(),
        content: content.to_string(),
        url: None,
        author: None,
        published_at: Utc::now(),
    }
}

#[tokio::test]
async fn unrelated_item_is_new() {
    let fx = fixture(DedupPolicy::default()).await;
    fx.insert("a", HEADLINE, "body", Utc::now()).await;

    let verdict = fx
        .engine
        .classify(
            fx.source.org_id,
            fx.source.id,
            &draft("b", "Yankees sign veteran reliever to one-year deal", "other"),
            Utc::now(),
        )
        .await
        .unwrap();
    assert_eq!(verdict, DedupVerdict::New);
    assert!(!verdict.is_duplicate());
}

#[tokio::test]
async fn same_external_id_is_an_exact_duplicate() {
    let fx = fixture(DedupPolicy::default()).await;
    let stored = fx.insert("a", HEADLINE, "body", Utc::now()).await;

    let verdict = fx
        .engine
        .classify(
            fx.source.org_id,
            fx.source.id,
            &draft("a", "Completely rewritten headline", "new body"),
            Utc::now(),
        )
        .await
        .unwrap();
    assert_eq!(verdict, DedupVerdict::ExactDuplicate(stored));
}

#[tokio::test]
async fn same_text_under_new_id_is_a_content_duplicate() {
    let fx = fixture(DedupPolicy::default()).await;
    let stored = fx.insert("a", HEADLINE, "Team says MRI pending.", Utc::now()).await;

    // Fingerprints ignore case.
    let verdict = fx
        .engine
        .classify(
            fx.source.org_id,
            fx.source.id,
            &draft("b", &HEADLINE.to_uppercase(), "team says mri pending."),
            Utc::now(),
        )
        .await
        .unwrap();
    assert_eq!(verdict, DedupVerdict::ContentDuplicate(stored));
}

#[tokio::test]
async fn content_window_excludes_old_items() {
    let fx = fixture(DedupPolicy {
        skip_near_duplicates: false,
        ..DedupPolicy::default()
    })
    .await;
    fx.insert("a", HEADLINE, "body", Utc::now() - Duration::hours(49))
        .await;

    let found = fx
        .engine
        .check_content_duplicate(fx.source.org_id, HEADLINE, "body", 48, Utc::now())
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn similar_headline_is_a_near_duplicate() {
    let fx = fixture(DedupPolicy::default()).await;
    let stored = fx.insert("a", HEADLINE, "body", Utc::now()).await;

    let verdict = fx
        .engine
        .classify(
            fx.source.org_id,
            fx.source.id,
            &draft("b", &format!("{HEADLINE} Sunday"), "different body"),
            Utc::now(),
        )
        .await
        .unwrap();
    match verdict {
        DedupVerdict::NearDuplicate { item, similarity } => {
            assert_eq!(item.id, stored.id);
            assert!((similarity - 7.0 / 8.0).abs() < 1e-9);
        }
        other => panic!("expected near duplicate, got {other:?}"),
    }
}

#[tokio::test]
async fn near_duplicates_can_be_allowed() {
    let fx = fixture(DedupPolicy {
        skip_near_duplicates: false,
        ..DedupPolicy::default()
    })
    .await;
    fx.insert("a", HEADLINE, "body", Utc::now()).await;

    let verdict = fx
        .engine
        .classify(
            fx.source.org_id,
            fx.source.id,
            &draft("b", &format!("{HEADLINE} Sunday"), "different body"),
            Utc::now(),
        )
        .await
        .unwrap();
    assert_eq!(verdict, DedupVerdict::New);
}

#[tokio::test]
async fn similar_headlines_are_ranked_and_windowed() {
    let fx = fixture(DedupPolicy::default()).await;
    let now = Utc::now();
    let close = fx
        .insert("close", &format!("{HEADLINE} Sunday"), "x", now)
        .await;
    let exact = fx
        .insert(
            "exact",
            "CHIEFS quarterback Mahomes ruled doubtful, with ankle injury!",
            "y",
            now - Duration::hours(1),
        )
        .await;
    fx.insert("stale", HEADLINE, "z", now - Duration::hours(30))
        .await;
    fx.insert("other", "Yankees sign veteran reliever", "w", now)
        .await;

    let similar = fx
        .engine
        .find_similar_headlines(fx.source.org_id, HEADLINE, 24, now)
        .await
        .unwrap();

    let ids: Vec<Uuid> = similar.iter().map(|s| s.item.id).collect();
    assert_eq!(ids, vec![exact.id, close.id]);
    assert!((similar[0].similarity - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn other_orgs_are_invisible() {
    let fx = fixture(DedupPolicy::default()).await;
    fx.insert("a", HEADLINE, "body", Utc::now()).await;

    let verdict = fx
        .engine
        .classify(Uuid::new_v4(), fx.source.id, &draft("a", HEADLINE, "body"), Utc::now())
        .await
        .unwrap();
    assert_eq!(verdict, DedupVerdict::New);
}

#[tokio::test]
async fn merge_folds_groups_into_earliest_item() {
    let fx = fixture(DedupPolicy::default()).await;
    let now = Utc::now();
    let primary = fx.insert("a", HEADLINE, "body", now).await;
    let dup_one = fx.insert("b", HEADLINE, "body", now).await;
    let dup_two = fx.insert("c", HEADLINE, "body", now).await;
    let loner = fx.insert("d", "Yankees sign reliever", "body", now).await;

    let shared = Uuid::new_v4();
    let unique = Uuid::new_v4();
    fx.store
        .upsert_clip_match(primary.id, shared, 0.9, "primary")
        .await
        .unwrap();
    fx.store
        .upsert_clip_match(dup_one.id, shared, 0.8, "collides")
        .await
        .unwrap();
    fx.store
        .upsert_clip_match(dup_two.id, unique, 0.7, "moves")
        .await
        .unwrap();

    let preview = fx
        .engine
        .merge_duplicates(fx.source.org_id, true, now)
        .await
        .unwrap();
    assert!(preview.dry_run);
    assert_eq!(preview.duplicate_groups, 1);
    assert_eq!(preview.items_merged, 2);
    assert_eq!(fx.store.news_items().len(), 4);

    let report = fx
        .engine
        .merge_duplicates(fx.source.org_id, false, now)
        .await
        .unwrap();
    assert_eq!(report.duplicate_groups, 1);
    assert_eq!(report.items_merged, 2);
    assert_eq!(report.clips_reassigned, 1);
    assert_eq!(report.clips_dropped, 1);

    let remaining: Vec<Uuid> = fx.store.news_items().iter().map(|i| i.id).collect();
    assert!(remaining.contains(&primary.id));
    assert!(remaining.contains(&loner.id));
    assert_eq!(remaining.len(), 2);

    let clips = fx.store.list_clip_matches(primary.id).await.unwrap();
    assert_eq!(clips.len(), 2);
    assert!(fx.store.get_news_item(primary.id).await.unwrap().unwrap().paired);
}
