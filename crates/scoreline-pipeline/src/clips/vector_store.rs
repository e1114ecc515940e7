//! Qdrant search over the clip candidate collection.
//!
//! Points carry an `org_id` payload field used as a filter and, optionally,
//! `candidate_id` and `title`. Without `candidate_id` the point id itself
//! must be a UUID.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ClipCandidate, ClipError};

#[derive(Debug, Clone)]
pub(crate) struct QdrantClient {
    client: reqwest::Client,
    base_url: String,
    collection: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    score_threshold: f64,
    with_payload: bool,
    filter: Filter,
}

#[derive(Serialize)]
struct Filter {
    must: Vec<FieldCondition>,
}

#[derive(Serialize)]
struct FieldCondition {
    key: &'static str,
    #[serde(rename = "match")]
    matches: MatchValue,
}

#[derive(Serialize)]
struct MatchValue {
    value: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    id: serde_json::Value,
    score: f64,
    #[serde(default)]
    payload: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ScoredPoint {
    fn candidate_id(&self) -> Option<Uuid> {
        self.payload
            .as_ref()
            .and_then(|p| p.get("candidate_id"))
            .and_then(serde_json::Value::as_str)
            .or_else(|| self.id.as_str())
            .and_then(|raw| Uuid::parse_str(raw).ok())
    }

    fn title(&self) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|p| p.get("title"))
            .and_then(serde_json::Value::as_str)
    }
}

impl QdrantClient {
    pub(crate) fn new(client: reqwest::Client, qdrant_url: &str, collection: &str) -> Self {
        Self {
            client,
            base_url: qdrant_url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
        }
    }

    /// Nearest candidates for `org_id` scoring at least `min_score`.
    ///
    /// # Errors
    ///
    /// Returns [`ClipError::Qdrant`] on network, status, or decode failure.
    pub(crate) async fn search(
        &self,
        org_id: Uuid,
        vector: &[f32],
        limit: usize,
        min_score: f64,
    ) -> Result<Vec<ClipCandidate>, ClipError> {
        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection
        );
        let body = SearchRequest {
            vector,
            limit,
            score_threshold: min_score,
            with_payload: true,
            filter: Filter {
                must: vec![FieldCondition {
                    key: "org_id",
                    matches: MatchValue {
                        value: org_id.to_string(),
                    },
                }],
            },
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClipError::Qdrant(format!("search request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(ClipError::Qdrant(format!(
                "search returned status {}",
                resp.status()
            )));
        }

        let parsed: SearchResponse = resp
            .json()
            .await
            .map_err(|e| ClipError::Qdrant(format!("search response parse error: {e}")))?;

        let mut candidates = Vec::with_capacity(parsed.result.len());
        for point in parsed.result {
            let Some(candidate_id) = point.candidate_id() else {
                tracing::warn!(point_id = %point.id, "clips: point has no usable candidate id");
                continue;
            };
            let reason = match point.title() {
                Some(title) => format!("headline similarity {:.2} to \"{title}\"", point.score),
                None => format!("headline similarity {:.2}", point.score),
            };
            candidates.push(ClipCandidate {
                candidate_id,
                score: point.score,
                reason,
            });
        }
        Ok(candidates)
    }
}
