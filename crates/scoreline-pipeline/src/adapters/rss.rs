//! RSS/Atom adapter (`adapter_type = "rss"`).
//!
//! Source config keys: `feed_url` (required), `default_type` (a news type
//! used when no headline keyword matches; defaults to `ANALYSIS`).

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use scoreline_core::{AppConfig, NewsItemDraft, NewsType, Source};

use super::{AdapterError, FetchBatch, FetchRequest, SourceAdapter};

pub const RSS_ADAPTER_TYPE: &str = "rss";

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Headline keyword rules, first match wins.
static TYPE_RULES: LazyLock<Vec<(Regex, NewsType)>> = LazyLock::new(|| {
    [
        (r"\bbreaking\b|\bjust in\b", NewsType::Breaking),
        (r"\btrade[ds]?\b|\bacquire[ds]?\b|\bdeal sends\b", NewsType::Trade),
        (
            r"\binjur(?:y|ed|ies)\b|\bruled out\b|\bquestionable\b|\bdoubtful\b|\binjured reserve\b",
            NewsType::Injury,
        ),
        (
            r"\bodds\b|\bspread\b|\bmoneyline\b|\bover/under\b|\bline moves?\b|\bbetting\b",
            NewsType::BettingLine,
        ),
        (
            r"\bfinal score\b|\bdefeats?\b|\bbeats?\b|\brecap\b|\bwin over\b",
            NewsType::GameResult,
        ),
        (r"\brumou?rs?\b|\breportedly\b|\blinked to\b|\binterest in\b", NewsType::Rumor),
        (r"\bschedule\b|\bkickoff time\b|\bfixtures?\b|\bpostponed\b", NewsType::Schedule),
    ]
    .into_iter()
    .map(|(pattern, news_type)| {
        (
            Regex::new(&format!("(?i){pattern}")).expect("valid regex"),
            news_type,
        )
    })
    .collect()
});

/// Classifies a headline by keyword, falling back to `default`.
#[must_use]
pub fn infer_news_type(headline: &str, default: NewsType) -> NewsType {
    TYPE_RULES
        .iter()
        .find(|(re, _)| re.is_match(headline))
        .map_or(default, |(_, news_type)| *news_type)
}

fn plain_text(html: &str) -> String {
    let stripped = TAG_RE.replace_all(html, " ");
    SPACE_RE.replace_all(stripped.trim(), " ").into_owned()
}

/// Parses an RSS or Atom document into drafts, newest first.
///
/// Entries without a title are skipped. Entries without a date are stamped
/// `now`. When `since` is set only strictly newer entries are kept.
///
/// # Errors
///
/// Returns [`AdapterError::Parse`] if the body is not a recognisable feed.
pub fn parse_feed(
    body: &[u8],
    default_type: NewsType,
    request: FetchRequest,
    now: DateTime<Utc>,
) -> Result<Vec<NewsItemDraft>, AdapterError> {
    let feed = feed_rs::parser::parse(body).map_err(|e| AdapterError::Parse(e.to_string()))?;

    let mut drafts: Vec<NewsItemDraft> = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let headline = entry.title.map(|t| plain_text(&t.content))?;
            if headline.is_empty() {
                return None;
            }

            let url = entry.links.first().map(|l| l.href.clone());
            let external_id = if entry.id.is_empty() {
                url.clone()?
            } else {
                entry.id
            };
            let content = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .map(|body| plain_text(&body))
                .unwrap_or_default();
            let published_at = entry.published.or(entry.updated).unwrap_or(now);

            Some(NewsItemDraft {
                external_id,
                news_type: infer_news_type(&headline, default_type),
                headline,
                content,
                url,
                author: entry.authors.first().map(|a| a.name.clone()),
                published_at,
            })
        })
        .filter(|draft| request.since.is_none_or(|since| draft.published_at > since))
        .collect();

    drafts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    drafts.truncate(request.limit);
    Ok(drafts)
}

#[derive(Debug, Clone)]
pub struct RssAdapter {
    client: reqwest::Client,
}

impl RssAdapter {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns [`AdapterError::Http`] if the HTTP client cannot be built.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.adapter_request_timeout_secs))
            .user_agent(config.adapter_user_agent.clone())
            .build()?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl SourceAdapter for RssAdapter {
    fn adapter_type(&self) -> &str {
        RSS_ADAPTER_TYPE
    }

    async fn fetch(
        &self,
        source: &Source,
        request: FetchRequest,
    ) -> Result<FetchBatch, AdapterError> {
        let feed_url = source
            .config_str("feed_url")
            .ok_or_else(|| AdapterError::Config(format!("source {} has no feed_url", source.id)))?;
        let default_type = match source.config_str("default_type") {
            Some(raw) => raw
                .parse::<NewsType>()
                .map_err(|e| AdapterError::Config(e.to_string()))?,
            None => NewsType::Analysis,
        };

        let response = self.client.get(feed_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Status {
                status: status.as_u16(),
                url: feed_url.to_string(),
            });
        }
        let body = response.bytes().await?;

        let items = parse_feed(&body, default_type, request, Utc::now())?;
        tracing::debug!(
            source_id = %source.id,
            feed_url,
            items = items.len(),
            "rss: feed parsed"
        );

        Ok(FetchBatch {
            items,
            ..FetchBatch::default()
        })
    }
}

#[cfg(test)]
#[path = "rss_test.rs"]
mod tests;
