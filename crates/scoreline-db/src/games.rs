//! Database operations for `odds_snapshots` and `game_results`.
//!
//! Both tables are keyed by `(org_id, external_game_id)` when the provider
//! supplies a game id, and by `(org_id, home_team, away_team, game_date)`
//! otherwise. Each key has its own partial unique index.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use scoreline_core::{GameResult, GameResultDraft, OddsDraft, OddsSnapshot, Sport};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const ODDS_COLUMNS: &str = "id, org_id, source_id, sport, external_game_id, home_team, away_team, \
     game_date, home_moneyline, away_moneyline, spread, total, bookmaker, captured_at, updated_at";

const RESULT_COLUMNS: &str = "id, org_id, source_id, sport, external_game_id, home_team, \
     away_team, game_date, home_score, away_score, outcome, updated_at";

/// A row from the `odds_snapshots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OddsSnapshotRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub source_id: Option<Uuid>,
    pub sport: String,
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

impl OddsSnapshotRow {
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] if the stored sport is unknown.
    pub fn into_snapshot(self) -> Result<OddsSnapshot, DbError> {
        Ok(OddsSnapshot {
            id: self.id,
            org_id: self.org_id,
            source_id: self.source_id,
            sport: self.sport.parse()?,
            external_game_id: self.external_game_id,
            home_team: self.home_team,
            away_team: self.away_team,
            game_date: self.game_date,
            home_moneyline: self.home_moneyline,
            away_moneyline: self.away_moneyline,
            spread: self.spread,
            total: self.total,
            bookmaker: self.bookmaker,
            captured_at: self.captured_at,
            updated_at: self.updated_at,
        })
    }
}

/// A row from the `game_results` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GameResultRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub source_id: Option<Uuid>,
    pub sport: String,
    pub external_game_id: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub game_date: DateTime<Utc>,
    pub home_score: i32,
    pub away_score: i32,
    pub outcome: String,
    pub updated_at: DateTime<Utc>,
}

impl GameResultRow {
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] if a stored enum value is unknown.
    pub fn into_result(self) -> Result<GameResult, DbError> {
        Ok(GameResult {
            id: self.id,
            org_id: self.org_id,
            source_id: self.source_id,
            sport: self.sport.parse()?,
            external_game_id: self.external_game_id,
            home_team: self.home_team,
            away_team: self.away_team,
            game_date: self.game_date,
            home_score: self.home_score,
            away_score: self.away_score,
            outcome: self.outcome.parse()?,
            updated_at: self.updated_at,
        })
    }
}

/// Inserts or refreshes the latest line for a game.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn upsert_odds_snapshot(
    pool: &PgPool,
    org_id: Uuid,
    source_id: Option<Uuid>,
    sport: Sport,
    draft: &OddsDraft,
) -> Result<OddsSnapshot, DbError> {
    let conflict_target = if draft.external_game_id.is_some() {
        "(org_id, external_game_id) WHERE external_game_id IS NOT NULL"
    } else {
        "(org_id, home_team, away_team, game_date) WHERE external_game_id IS NULL"
    };
    let sql = format!(
        "INSERT INTO odds_snapshots (id, org_id, source_id, sport, external_game_id, home_team, \
                                     away_team, game_date, home_moneyline, away_moneyline, \
                                     spread, total, bookmaker) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         ON CONFLICT {conflict_target} DO UPDATE SET \
             source_id = EXCLUDED.source_id, \
             home_team = EXCLUDED.home_team, \
             away_team = EXCLUDED.away_team, \
             game_date = EXCLUDED.game_date, \
             home_moneyline = EXCLUDED.home_moneyline, \
             away_moneyline = EXCLUDED.away_moneyline, \
             spread = EXCLUDED.spread, \
             total = EXCLUDED.total, \
             bookmaker = EXCLUDED.bookmaker, \
             captured_at = NOW(), \
             updated_at = NOW() \
         RETURNING {ODDS_COLUMNS}"
    );
    let row = sqlx::query_as::<_, OddsSnapshotRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(org_id)
        .bind(source_id)
        .bind(sport.as_str())
        .bind(&draft.external_game_id)
        .bind(&draft.home_team)
        .bind(&draft.away_team)
        .bind(draft.game_date)
        .bind(draft.home_moneyline)
        .bind(draft.away_moneyline)
        .bind(draft.spread)
        .bind(draft.total)
        .bind(&draft.bookmaker)
        .fetch_one(pool)
        .await?;

    row.into_snapshot()
}

/// Inserts or refreshes a final score, classifying the outcome when the
/// draft omits it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn upsert_game_result(
    pool: &PgPool,
    org_id: Uuid,
    source_id: Option<Uuid>,
    sport: Sport,
    draft: &GameResultDraft,
) -> Result<GameResult, DbError> {
    let conflict_target = if draft.external_game_id.is_some() {
        "(org_id, external_game_id) WHERE external_game_id IS NOT NULL"
    } else {
        "(org_id, home_team, away_team, game_date) WHERE external_game_id IS NULL"
    };
    let sql = format!(
        "INSERT INTO game_results (id, org_id, source_id, sport, external_game_id, home_team, \
                                   away_team, game_date, home_score, away_score, outcome) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         ON CONFLICT {conflict_target} DO UPDATE SET \
             source_id = EXCLUDED.source_id, \
             home_team = EXCLUDED.home_team, \
             away_team = EXCLUDED.away_team, \
             game_date = EXCLUDED.game_date, \
             home_score = EXCLUDED.home_score, \
             away_score = EXCLUDED.away_score, \
             outcome = EXCLUDED.outcome, \
             updated_at = NOW() \
         RETURNING {RESULT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, GameResultRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(org_id)
        .bind(source_id)
        .bind(sport.as_str())
        .bind(&draft.external_game_id)
        .bind(&draft.home_team)
        .bind(&draft.away_team)
        .bind(draft.game_date)
        .bind(draft.home_score)
        .bind(draft.away_score)
        .bind(draft.resolved_outcome().as_str())
        .fetch_one(pool)
        .await?;

    row.into_result()
}

/// Games starting after `from` and no later than `until`, soonest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_upcoming_games(
    pool: &PgPool,
    org_id: Uuid,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Vec<OddsSnapshot>, DbError> {
    let sql = format!(
        "SELECT {ODDS_COLUMNS} FROM odds_snapshots \
         WHERE org_id = $1 AND game_date > $2 AND game_date <= $3 \
         ORDER BY game_date ASC"
    );
    let rows = sqlx::query_as::<_, OddsSnapshotRow>(&sql)
        .bind(org_id)
        .bind(from)
        .bind(until)
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(OddsSnapshotRow::into_snapshot).collect()
}
