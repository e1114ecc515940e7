use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::news::{NewsType, Sport};
use crate::sources::{RunStatus, ScheduleType};

/// A news search that runs on a schedule and exports its results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedQuery {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub sport: Option<Sport>,
    /// Empty means every type matches.
    pub news_types: Vec<NewsType>,
    pub min_score: Option<i32>,
    pub lookback_hours: i32,
    pub schedule_type: ScheduleType,
    pub refresh_interval_minutes: i32,
    pub cron_expression: Option<String>,
    pub enabled: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One execution of a [`SavedQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRun {
    pub id: Uuid,
    pub query_id: Uuid,
    pub org_id: Uuid,
    pub status: RunStatus,
    pub triggered_by: String,
    pub result_count: i32,
    pub item_ids: Vec<Uuid>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}
