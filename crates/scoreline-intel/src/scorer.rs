//! Weighted multi-factor importance model.
//!
//! Eight factors, each in `[0, 1]`, are combined with fixed weights into an
//! integer score in `[0, 100]`. A short reasoning string explains which
//! factors stood out.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use scoreline_core::{NewsItem, NewsType, ScoreBreakdown, UpcomingGame};
use serde::Serialize;
use uuid::Uuid;

use crate::authority::SourceAuthority;

pub const WEIGHT_RECENCY: f64 = 0.15;
pub const WEIGHT_TIME_SENSITIVITY: f64 = 0.15;
pub const WEIGHT_ENTITY_RELEVANCE: f64 = 0.15;
pub const WEIGHT_TOPIC: f64 = 0.15;
pub const WEIGHT_EXCLUSIVITY: f64 = 0.10;
pub const WEIGHT_SOURCE_AUTHORITY: f64 = 0.20;
pub const WEIGHT_GAME_PROXIMITY: f64 = 0.05;
pub const WEIGHT_BETTING_RELEVANCE: f64 = 0.05;

/// Floor reached by the recency decay; also the value from 72 hours on.
const RECENCY_FLOOR: f64 = 0.05;
const RECENCY_CUTOFF_HOURS: f64 = 72.0;
const RECENCY_DECAY_HOURS: f64 = 17.0;

/// Neutral game proximity when nothing ties the item to an upcoming game.
const NO_GAME_PROXIMITY: f64 = 0.3;

static URGENT_HEADLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)breaking|just in|happening now|developing").expect("valid regex")
});

/// Additive exclusivity signals, evaluated in order.
static EXCLUSIVITY_RULES: LazyLock<Vec<(Regex, f64)>> = LazyLock::new(|| {
    [
        (r"(?i)first to report", 0.3),
        (r"(?i)\bexclusive", 0.25),
        (r"(?i)\bbreaking\b", 0.2),
        (r"(?i)\bsources (?:tell|say)\b|\bper sources\b", 0.15),
        (r"(?i)\bconfirmed\b", 0.1),
    ]
    .into_iter()
    .map(|(pattern, bonus)| (Regex::new(pattern).expect("valid regex"), bonus))
    .collect()
});

static REPOST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)via @|\bretweet|\bRT:").expect("valid regex"));

static HIGH_BETTING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:starter|starting|ruled[- ]out|out|doubtful|questionable|injury report|line movement|spread|over/under|over-under|moneyline)\b",
    )
    .expect("valid regex")
});

static MEDIUM_BETTING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:day-to-day|day to day|limited practice|probable|game-time decision)\b")
        .expect("valid regex")
});

/// The fields of a news item the model looks at.
#[derive(Debug, Clone, Copy)]
pub struct ScoreSubject<'a> {
    pub headline: &'a str,
    pub content: &'a str,
    pub news_type: NewsType,
    pub published_at: DateTime<Utc>,
    pub teams: &'a [String],
    pub players: &'a [String],
}

impl<'a> From<&'a NewsItem> for ScoreSubject<'a> {
    fn from(item: &'a NewsItem) -> Self {
        Self {
            headline: &item.headline,
            content: &item.content,
            news_type: item.news_type,
            published_at: item.published_at,
            teams: &item.teams,
            players: &item.players,
        }
    }
}

/// Result of scoring one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportanceScore {
    pub total_score: i32,
    pub breakdown: ScoreBreakdown,
    pub reasoning: String,
}

/// An item id paired with its score, for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankedItem {
    pub id: Uuid,
    pub importance_score: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ImportanceScorer {
    authority: SourceAuthority,
}

impl ImportanceScorer {
    #[must_use]
    pub fn new(authority: SourceAuthority) -> Self {
        Self { authority }
    }

    /// Score one item as of `now`.
    #[must_use]
    pub fn calculate(
        &self,
        subject: &ScoreSubject<'_>,
        source_name: Option<&str>,
        upcoming_games: &[UpcomingGame],
        now: DateTime<Utc>,
    ) -> ImportanceScore {
        let text = format!("{} {}", subject.headline, subject.content);
        let hours_ago = hours_between(subject.published_at, now);

        let breakdown = ScoreBreakdown {
            recency: recency(hours_ago),
            time_sensitivity: time_sensitivity(subject.headline, subject.news_type),
            entity_relevance: entity_relevance(subject.teams.len(), subject.players.len()),
            topic_weight: topic_weight(subject.news_type),
            exclusivity: exclusivity(&text),
            source_authority: self.authority.score(source_name),
            game_proximity: game_proximity(subject.teams, upcoming_games, now),
            betting_relevance: betting_relevance(&text, subject.news_type),
        };

        ImportanceScore {
            total_score: total_score(&breakdown),
            reasoning: reasoning(&breakdown, subject.news_type),
            breakdown,
        }
    }

    /// Score many items. `source_names` maps a source id to its display name.
    #[must_use]
    pub fn calculate_batch(
        &self,
        items: &[NewsItem],
        source_names: &HashMap<Uuid, String>,
        upcoming_games: &[UpcomingGame],
        now: DateTime<Utc>,
    ) -> HashMap<Uuid, ImportanceScore> {
        items
            .iter()
            .map(|item| {
                let score = self.calculate(
                    &ScoreSubject::from(item),
                    source_names.get(&item.source_id).map(String::as_str),
                    upcoming_games,
                    now,
                );
                (item.id, score)
            })
            .collect()
    }
}

/// Order items by descending score; ties keep their input order.
pub fn sort_by_importance(items: &mut [RankedItem]) {
    items.sort_by(|a, b| b.importance_score.cmp(&a.importance_score));
}

/// Weighted sum scaled to `[0, 100]` and rounded.
#[must_use]
pub fn total_score(b: &ScoreBreakdown) -> i32 {
    let sum = b.recency * WEIGHT_RECENCY
        + b.time_sensitivity * WEIGHT_TIME_SENSITIVITY
        + b.entity_relevance * WEIGHT_ENTITY_RELEVANCE
        + b.topic_weight * WEIGHT_TOPIC
        + b.exclusivity * WEIGHT_EXCLUSIVITY
        + b.source_authority * WEIGHT_SOURCE_AUTHORITY
        + b.game_proximity * WEIGHT_GAME_PROXIMITY
        + b.betting_relevance * WEIGHT_BETTING_RELEVANCE;

    #[allow(clippy::cast_possible_truncation)]
    let score = (sum * 100.0).round().clamp(0.0, 100.0) as i32;
    score
}

#[allow(clippy::cast_precision_loss)]
fn hours_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 3_600_000.0
}

/// Exponential decay with a 17 hour time constant, held at the floor once
/// it gets there so the curve never rises again.
#[must_use]
pub fn recency(hours_ago: f64) -> f64 {
    if hours_ago <= 0.0 {
        return 1.0;
    }
    if hours_ago >= RECENCY_CUTOFF_HOURS {
        return RECENCY_FLOOR;
    }
    (-hours_ago / RECENCY_DECAY_HOURS).exp().max(RECENCY_FLOOR)
}

#[must_use]
pub fn time_sensitivity(headline: &str, news_type: NewsType) -> f64 {
    if URGENT_HEADLINE_RE.is_match(headline) {
        return 1.0;
    }
    match news_type {
        NewsType::Breaking => 1.0,
        NewsType::Trade => 0.9,
        NewsType::Injury => 0.85,
        NewsType::GameResult => 0.7,
        NewsType::BettingLine => 0.6,
        NewsType::Rumor => 0.5,
        NewsType::Schedule => 0.3,
        NewsType::Analysis => 0.2,
    }
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn entity_relevance(team_count: usize, player_count: usize) -> f64 {
    if team_count == 0 && player_count == 0 {
        return 0.2;
    }
    let teams = (0.15 * team_count as f64).min(0.3);
    let players = (0.10 * player_count as f64).min(0.4);
    (0.3 + teams + players).min(1.0)
}

#[must_use]
pub fn topic_weight(news_type: NewsType) -> f64 {
    match news_type {
        NewsType::Trade => 0.95,
        NewsType::Breaking => 0.9,
        NewsType::Injury => 0.85,
        NewsType::BettingLine => 0.75,
        NewsType::GameResult => 0.7,
        NewsType::Rumor => 0.6,
        NewsType::Schedule => 0.4,
        NewsType::Analysis => 0.3,
    }
}

#[must_use]
pub fn exclusivity(text: &str) -> f64 {
    let mut score = 0.3;
    for (re, bonus) in EXCLUSIVITY_RULES.iter() {
        if re.is_match(text) {
            score += bonus;
        }
    }
    if REPOST_RE.is_match(text) {
        score -= 0.2;
    }
    score.clamp(0.0, 1.0)
}

/// Step function over the hours until the nearest future game involving
/// one of the item's teams. Team names match by case-insensitive substring
/// in either direction.
#[must_use]
pub fn game_proximity(teams: &[String], games: &[UpcomingGame], now: DateTime<Utc>) -> f64 {
    if teams.is_empty() || games.is_empty() {
        return NO_GAME_PROXIMITY;
    }

    let item_teams: Vec<String> = teams.iter().map(|t| t.to_lowercase()).collect();
    let nearest = games
        .iter()
        .filter(|game| game.starts_at > now)
        .filter(|game| {
            game.teams.iter().any(|game_team| {
                let game_team = game_team.to_lowercase();
                item_teams
                    .iter()
                    .any(|t| t.contains(&game_team) || game_team.contains(t.as_str()))
            })
        })
        .map(|game| hours_between(now, game.starts_at))
        .min_by(f64::total_cmp);

    match nearest {
        Some(h) if h <= 2.0 => 1.0,
        Some(h) if h <= 12.0 => 0.8,
        Some(h) if h <= 24.0 => 0.6,
        Some(h) if h <= 48.0 => 0.4,
        _ => NO_GAME_PROXIMITY,
    }
}

#[must_use]
pub fn betting_relevance(text: &str, news_type: NewsType) -> f64 {
    if news_type == NewsType::BettingLine {
        return 1.0;
    }
    if HIGH_BETTING_RE.is_match(text) {
        return 0.9;
    }
    if MEDIUM_BETTING_RE.is_match(text) {
        return 0.6;
    }
    match news_type {
        NewsType::Injury => 0.7,
        NewsType::Trade => 0.5,
        NewsType::GameResult => 0.4,
        _ => 0.2,
    }
}

/// Human-readable clauses for the factors that stood out.
#[must_use]
pub fn reasoning(b: &ScoreBreakdown, news_type: NewsType) -> String {
    let mut clauses: Vec<String> = Vec::new();
    if b.recency > 0.8 {
        clauses.push("Very recent news".to_string());
    }
    if b.topic_weight > 0.8 {
        clauses.push(format!("High-impact {} news", news_type.label()));
    }
    if b.source_authority > 0.8 {
        clauses.push("From authoritative source".to_string());
    }
    if b.exclusivity > 0.7 {
        clauses.push("Appears to be exclusive/breaking".to_string());
    }
    if b.betting_relevance > 0.7 {
        clauses.push("May affect betting lines".to_string());
    }
    if b.game_proximity > 0.7 {
        clauses.push("Relates to upcoming game".to_string());
    }

    if clauses.is_empty() {
        "Standard news item".to_string()
    } else {
        clauses.join(". ")
    }
}

#[cfg(test)]
#[path = "scorer_test.rs"]
mod tests;
