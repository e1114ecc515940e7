//! Duplicate detection and merging over stored news items.
//!
//! Three checks run in order against an incoming draft: the natural key
//! `(org, source, external_id)`, the content fingerprint, then headline
//! similarity. Merging folds fingerprint groups into their earliest item.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use scoreline_core::{NewsItem, NewsItemDraft};
use scoreline_db::{DbError, SharedStore};
use scoreline_intel::text::token_set_similarity;
use scoreline_intel::{content_fingerprint, tokenize, SIMILARITY_THRESHOLD};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DedupPolicy {
    pub similar_window_hours: i64,
    pub content_window_hours: i64,
    /// Most recent items loaded for a headline comparison.
    pub similar_scan_limit: i64,
    /// When `false`, near-duplicate headlines are ingested anyway.
    pub skip_near_duplicates: bool,
    pub merge_window_days: i64,
}

impl Default for DedupPolicy {
    fn default() -> Self {
        Self {
            similar_window_hours: 24,
            content_window_hours: 48,
            similar_scan_limit: 500,
            skip_near_duplicates: true,
            merge_window_days: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarItem {
    pub item: NewsItem,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DedupVerdict {
    New,
    ExactDuplicate(NewsItem),
    ContentDuplicate(NewsItem),
    NearDuplicate { item: NewsItem, similarity: f64 },
}

impl DedupVerdict {
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        !matches!(self, DedupVerdict::New)
    }

    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            DedupVerdict::New => "new",
            DedupVerdict::ExactDuplicate(_) => "exact",
            DedupVerdict::ContentDuplicate(_) => "content",
            DedupVerdict::NearDuplicate { .. } => "near",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub duplicate_groups: usize,
    pub items_merged: u64,
    pub clips_reassigned: u64,
    pub clips_dropped: u64,
    pub dry_run: bool,
}

#[derive(Clone)]
pub struct DedupEngine {
    store: SharedStore,
    policy: DedupPolicy,
}

impl DedupEngine {
    #[must_use]
    pub fn new(store: SharedStore, policy: DedupPolicy) -> Self {
        Self { store, policy }
    }

    #[must_use]
    pub fn policy(&self) -> &DedupPolicy {
        &self.policy
    }

    /// # Errors
    ///
    /// Returns [`DbError`] if the lookup fails.
    pub async fn check_exact_duplicate(
        &self,
        org_id: Uuid,
        source_id: Uuid,
        external_id: &str,
    ) -> Result<Option<NewsItem>, DbError> {
        self.store
            .find_news_item_by_external_id(org_id, source_id, external_id)
            .await
    }

    /// Items published in the window whose headline clears the similarity
    /// threshold, most similar first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the recent items cannot be loaded.
    pub async fn find_similar_headlines(
        &self,
        org_id: Uuid,
        headline: &str,
        window_hours: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<SimilarItem>, DbError> {
        let since = now - Duration::hours(window_hours);
        let recent = self
            .store
            .list_recent_news_items(org_id, since, self.policy.similar_scan_limit)
            .await?;

        let target = tokenize(headline);
        let mut similar: Vec<SimilarItem> = recent
            .into_iter()
            .filter_map(|item| {
                let similarity = token_set_similarity(&target, &tokenize(&item.headline));
                (similarity >= SIMILARITY_THRESHOLD).then_some(SimilarItem { item, similarity })
            })
            .collect();
        similar.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        Ok(similar)
    }

    /// The earliest item in the window sharing this content fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the lookup fails.
    pub async fn check_content_duplicate(
        &self,
        org_id: Uuid,
        headline: &str,
        content: &str,
        window_hours: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<NewsItem>, DbError> {
        let fingerprint = content_fingerprint(headline, content);
        self.store
            .find_news_item_by_fingerprint(org_id, &fingerprint, now - Duration::hours(window_hours))
            .await
    }

    /// Runs the exact, content, and headline checks in that order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if any lookup fails.
    pub async fn classify(
        &self,
        org_id: Uuid,
        source_id: Uuid,
        draft: &NewsItemDraft,
        now: DateTime<Utc>,
    ) -> Result<DedupVerdict, DbError> {
        if let Some(item) = self
            .check_exact_duplicate(org_id, source_id, &draft.external_id)
            .await?
        {
            return Ok(DedupVerdict::ExactDuplicate(item));
        }

        if let Some(item) = self
            .check_content_duplicate(
                org_id,
                &draft.headline,
                &draft.content,
                self.policy.content_window_hours,
                now,
            )
            .await?
        {
            return Ok(DedupVerdict::ContentDuplicate(item));
        }

        if self.policy.skip_near_duplicates {
            let mut similar = self
                .find_similar_headlines(
                    org_id,
                    &draft.headline,
                    self.policy.similar_window_hours,
                    now,
                )
                .await?;
            if !similar.is_empty() {
                let best = similar.swap_remove(0);
                return Ok(DedupVerdict::NearDuplicate {
                    item: best.item,
                    similarity: best.similarity,
                });
            }
        }

        Ok(DedupVerdict::New)
    }

    /// Folds every fingerprint group created inside the merge window into
    /// its earliest-created member. With `dry_run` only the counts are
    /// computed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if loading or any group merge fails. Groups merged
    /// before the failure stay merged.
    pub async fn merge_duplicates(
        &self,
        org_id: Uuid,
        dry_run: bool,
        now: DateTime<Utc>,
    ) -> Result<MergeReport, DbError> {
        let since = now - Duration::days(self.policy.merge_window_days);
        let items = self
            .store
            .list_news_items_created_since(org_id, since)
            .await?;

        let mut order: Vec<&str> = Vec::new();
        let mut groups: HashMap<&str, Vec<&NewsItem>> = HashMap::new();
        for item in &items {
            let group = groups.entry(item.content_fingerprint.as_str()).or_default();
            if group.is_empty() {
                order.push(item.content_fingerprint.as_str());
            }
            group.push(item);
        }

        let mut report = MergeReport {
            dry_run,
            ..MergeReport::default()
        };

        for fingerprint in order {
            let Some(members) = groups.get_mut(fingerprint) else {
                continue;
            };
            if members.len() < 2 {
                continue;
            }
            // Stable: ties keep the store's creation order.
            members.sort_by_key(|i| i.created_at);

            let primary = members[0].id;
            let duplicates: Vec<Uuid> = members[1..].iter().map(|i| i.id).collect();
            report.duplicate_groups += 1;

            if dry_run {
                report.items_merged += duplicates.len() as u64;
                continue;
            }

            let outcome = self
                .store
                .merge_news_items(org_id, primary, &duplicates)
                .await?;
            tracing::info!(
                org_id = %org_id,
                primary_id = %primary,
                merged = outcome.items_deleted,
                clips_reassigned = outcome.clips_reassigned,
                "dedup: merged duplicate group"
            );
            report.items_merged += outcome.items_deleted;
            report.clips_reassigned += outcome.clips_reassigned;
            report.clips_dropped += outcome.clips_dropped;
        }

        Ok(report)
    }
}
