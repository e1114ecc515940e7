use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::text_enum;

/// Editorial classification of a news item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NewsType {
    Trade,
    Injury,
    GameResult,
    BettingLine,
    Breaking,
    Rumor,
    Analysis,
    Schedule,
}

text_enum!(NewsType, "news type", {
    Trade => "TRADE",
    Injury => "INJURY",
    GameResult => "GAME_RESULT",
    BettingLine => "BETTING_LINE",
    Breaking => "BREAKING",
    Rumor => "RUMOR",
    Analysis => "ANALYSIS",
    Schedule => "SCHEDULE",
});

impl NewsType {
    /// Lowercase, space-separated label used in human-readable reasoning.
    #[must_use]
    pub fn label(&self) -> String {
        self.as_str().to_lowercase().replace('_', " ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sport {
    Nfl,
    Nba,
    Mlb,
    Nhl,
}

text_enum!(Sport, "sport", {
    Nfl => "NFL",
    Nba => "NBA",
    Mlb => "MLB",
    Nhl => "NHL",
});

/// Per-factor importance breakdown. Every field lies in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub recency: f64,
    pub time_sensitivity: f64,
    pub entity_relevance: f64,
    pub topic_weight: f64,
    pub exclusivity: f64,
    pub source_authority: f64,
    pub game_proximity: f64,
    pub betting_relevance: f64,
}

/// Teams, players and topic tags derived from an item's text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub teams: Vec<String>,
    pub players: Vec<String>,
    pub topics: Vec<String>,
}

impl ExtractedEntities {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty() && self.players.is_empty() && self.topics.is_empty()
    }
}

/// A raw news item as delivered by a source adapter, before dedup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItemDraft {
    pub external_id: String,
    pub news_type: NewsType,
    pub headline: String,
    pub content: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// A deduplicated, persisted news item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: Uuid,
    pub org_id: Uuid,
    pub source_id: Uuid,
    pub external_id: String,
    pub news_type: NewsType,
    pub sport: Sport,
    pub headline: String,
    pub content: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    pub teams: Vec<String>,
    pub players: Vec<String>,
    pub topics: Vec<String>,
    pub content_fingerprint: String,
    pub importance_score: Option<i32>,
    pub score_breakdown: Option<ScoreBreakdown>,
    pub score_reasoning: Option<String>,
    pub scored_at: Option<DateTime<Utc>>,
    pub paired: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn news_type_round_trips_through_text() {
        for ty in [
            NewsType::Trade,
            NewsType::GameResult,
            NewsType::BettingLine,
            NewsType::Schedule,
        ] {
            assert_eq!(ty.as_str().parse::<NewsType>().unwrap(), ty);
        }
    }

    #[test]
    fn news_type_label_is_lowercase_words() {
        assert_eq!(NewsType::BettingLine.label(), "betting line");
        assert_eq!(NewsType::Breaking.label(), "breaking");
    }

    #[test]
    fn unknown_sport_is_rejected() {
        let err = "CRICKET".parse::<Sport>().unwrap_err();
        assert!(err.to_string().contains("CRICKET"));
    }

    #[test]
    fn news_type_serializes_screaming_snake() {
        let json = serde_json::to_string(&NewsType::GameResult).unwrap();
        assert_eq!(json, "\"GAME_RESULT\"");
    }
}
