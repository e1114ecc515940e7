//! Query vectors for clip search, produced by a TEI `/embed` endpoint.
//!
//! A news item is embedded as its headline followed by the teams and
//! players extracted from it, so clips tagged with the same names rank
//! higher than clips that only share wording.

use reqwest::StatusCode;
use scoreline_core::NewsItem;
use serde::Serialize;
use thiserror::Error;

use super::ClipError;

#[derive(Debug, Error)]
pub(crate) enum EmbedError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("service answered {0}")]
    Status(StatusCode),

    #[error("unreadable response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("expected one vector, got {0}")]
    Count(usize),

    #[error("empty vector")]
    EmptyVector,
}

impl From<EmbedError> for ClipError {
    fn from(e: EmbedError) -> Self {
        ClipError::Tei(e.to_string())
    }
}

/// Text sent to the embedder for `item`: `headline | Team, Player`.
pub(crate) fn clip_query_text(item: &NewsItem) -> String {
    let entities: Vec<&str> = item
        .teams
        .iter()
        .chain(&item.players)
        .map(String::as_str)
        .collect();
    if entities.is_empty() {
        item.headline.clone()
    } else {
        format!("{} | {}", item.headline, entities.join(", "))
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: [&'a str; 1],
    truncate: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct TeiEmbedder {
    client: reqwest::Client,
    endpoint: String,
}

impl TeiEmbedder {
    pub(crate) fn new(client: reqwest::Client, tei_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/embed", tei_url.trim_end_matches('/')),
        }
    }

    /// Embeds [`clip_query_text`] for `item`. Over-long input is truncated
    /// by the service rather than rejected.
    pub(crate) async fn embed_item(&self, item: &NewsItem) -> Result<Vec<f32>, EmbedError> {
        let text = clip_query_text(item);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest {
                inputs: [text.as_str()],
                truncate: true,
            })
            .send()
            .await
            .map_err(EmbedError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbedError::Status(status));
        }

        let mut vectors: Vec<Vec<f32>> = response.json().await.map_err(EmbedError::Decode)?;
        if vectors.len() != 1 {
            return Err(EmbedError::Count(vectors.len()));
        }
        let vector = vectors.swap_remove(0);
        if vector.is_empty() {
            return Err(EmbedError::EmptyVector);
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use scoreline_core::{NewsType, Sport};
    use uuid::Uuid;

    use super::*;

    fn item(teams: &[&str], players: &[&str]) -> NewsItem {
        NewsItem {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            source_id: Uuid::new_v4(),
            external_id: "x".to_string(),
            news_type: NewsType::GameResult,
            sport: Sport::Nfl,
            headline: "Chiefs rally past Bills".to_string(),
            content: String::new(),
            url: None,
            author: None,
            published_at: Utc::now(),
            teams: teams.iter().map(ToString::to_string).collect(),
            players: players.iter().map(ToString::to_string).collect(),
            topics: vec![],
            content_fingerprint: "fp".to_string(),
            importance_score: None,
            score_breakdown: None,
            score_reasoning: None,
            scored_at: None,
            paired: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn query_text_is_headline_alone_without_entities() {
        assert_eq!(clip_query_text(&item(&[], &[])), "Chiefs rally past Bills");
    }

    #[test]
    fn query_text_appends_teams_then_players() {
        let text = clip_query_text(&item(
            &["Kansas City Chiefs", "Buffalo Bills"],
            &["Patrick Mahomes"],
        ));
        assert_eq!(
            text,
            "Chiefs rally past Bills | Kansas City Chiefs, Buffalo Bills, Patrick Mahomes"
        );
    }

    #[test]
    fn embed_errors_become_tei_clip_errors() {
        let err: ClipError = EmbedError::Status(StatusCode::SERVICE_UNAVAILABLE).into();
        assert!(matches!(err, ClipError::Tei(ref m) if m.contains("503")));
        let err: ClipError = EmbedError::Count(2).into();
        assert!(matches!(err, ClipError::Tei(ref m) if m == "expected one vector, got 2"));
    }
}
