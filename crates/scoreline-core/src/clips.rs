use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::text_enum;

/// Editorial review state of a proposed clip pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClipMatchStatus {
    Pending,
    Approved,
    Rejected,
}

text_enum!(ClipMatchStatus, "clip match status", {
    Pending => "PENDING",
    Approved => "APPROVED",
    Rejected => "REJECTED",
});

/// Persisted pairing between a news item and a candidate video clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipMatch {
    pub id: Uuid,
    pub news_item_id: Uuid,
    pub candidate_id: Uuid,
    pub match_score: f64,
    pub match_reason: String,
    pub status: ClipMatchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
