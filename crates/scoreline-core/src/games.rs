use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::news::Sport;
use crate::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameOutcome {
    HomeWin,
    AwayWin,
    Tie,
}

text_enum!(GameOutcome, "game outcome", {
    HomeWin => "HOME_WIN",
    AwayWin => "AWAY_WIN",
    Tie => "TIE",
});

impl GameOutcome {
    /// Classify a final score.
    #[must_use]
    pub fn from_score(home_score: i32, away_score: i32) -> Self {
        match home_score.cmp(&away_score) {
            std::cmp::Ordering::Greater => GameOutcome::HomeWin,
            std::cmp::Ordering::Less => GameOutcome::AwayWin,
            std::cmp::Ordering::Equal => GameOutcome::Tie,
        }
    }
}

/// Betting line as delivered by an adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsDraft {
    pub external_game_id: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub game_date: DateTime<Utc>,
    pub home_moneyline: Option<i32>,
    pub away_moneyline: Option<i32>,
    pub spread: Option<Decimal>,
    pub total: Option<Decimal>,
    pub bookmaker: Option<String>,
}

/// Latest known betting line for a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsSnapshot {
    pub id: Uuid,
    pub org_id: Uuid,
    pub source_id: Option<Uuid>,
    pub sport: Sport,
    pub external_game_id: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub game_date: DateTime<Utc>,
    pub home_moneyline: Option<i32>,
    pub away_moneyline: Option<i32>,
    pub spread: Option<Decimal>,
    pub total: Option<Decimal>,
    pub bookmaker: Option<String>,
    pub captured_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Final score as delivered by an adapter. `outcome` is derived from the
/// score when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResultDraft {
    pub external_game_id: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub game_date: DateTime<Utc>,
    pub home_score: i32,
    pub away_score: i32,
    pub outcome: Option<GameOutcome>,
}

impl GameResultDraft {
    #[must_use]
    pub fn resolved_outcome(&self) -> GameOutcome {
        self.outcome
            .unwrap_or_else(|| GameOutcome::from_score(self.home_score, self.away_score))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub id: Uuid,
    pub org_id: Uuid,
    pub source_id: Option<Uuid>,
    pub sport: Sport,
    pub external_game_id: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub game_date: DateTime<Utc>,
    pub home_score: i32,
    pub away_score: i32,
    pub outcome: GameOutcome,
    pub updated_at: DateTime<Utc>,
}

/// A scheduled game used by the game-proximity factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingGame {
    pub teams: Vec<String>,
    pub starts_at: DateTime<Utc>,
}

impl From<&OddsSnapshot> for UpcomingGame {
    fn from(snapshot: &OddsSnapshot) -> Self {
        Self {
            teams: vec![snapshot.home_team.clone(), snapshot.away_team.clone()],
            starts_at: snapshot.game_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_classified_from_score() {
        assert_eq!(GameOutcome::from_score(24, 17), GameOutcome::HomeWin);
        assert_eq!(GameOutcome::from_score(3, 4), GameOutcome::AwayWin);
        assert_eq!(GameOutcome::from_score(2, 2), GameOutcome::Tie);
    }

    #[test]
    fn explicit_outcome_wins_over_score() {
        let draft = GameResultDraft {
            external_game_id: None,
            home_team: "Dallas Stars".to_string(),
            away_team: "Colorado Avalanche".to_string(),
            game_date: Utc::now(),
            home_score: 2,
            away_score: 2,
            outcome: Some(GameOutcome::AwayWin),
        };
        assert_eq!(draft.resolved_outcome(), GameOutcome::AwayWin);
    }
}
