use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::news::Sport;
use crate::text_enum;

/// Recurrence policy for sources and saved queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleType {
    Manual,
    Hourly,
    Daily,
    Weekdays,
    Weekly,
    Custom,
}

text_enum!(ScheduleType, "schedule type", {
    Manual => "MANUAL",
    Hourly => "HOURLY",
    Daily => "DAILY",
    Weekdays => "WEEKDAYS",
    Weekly => "WEEKLY",
    Custom => "CUSTOM",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceStatus {
    Active,
    Paused,
}

text_enum!(SourceStatus, "source status", {
    Active => "ACTIVE",
    Paused => "PAUSED",
});

/// Lifecycle of a fetch run or query run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

text_enum!(RunStatus, "run status", {
    Queued => "QUEUED",
    Running => "RUNNING",
    Succeeded => "SUCCEEDED",
    Failed => "FAILED",
});

impl RunStatus {
    /// `true` while the run still holds the per-source overlap guard.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, RunStatus::Queued | RunStatus::Running)
    }
}

/// A configured external feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub adapter_type: String,
    pub sport: Sport,
    /// Adapter-specific settings, e.g. `{"feed_url": "..."}` for RSS.
    pub config: serde_json::Value,
    pub schedule_type: ScheduleType,
    pub refresh_interval_minutes: i32,
    pub cron_expression: Option<String>,
    pub status: SourceStatus,
    pub last_fetch_at: Option<DateTime<Utc>>,
    pub next_fetch_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_error_message: Option<String>,
    pub error_count: i32,
    pub consecutive_errors: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Source {
    /// Read a string setting from the adapter config object.
    #[must_use]
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(serde_json::Value::as_str)
    }
}

/// One fetch attempt for a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFetchRun {
    pub id: Uuid,
    pub source_id: Uuid,
    pub org_id: Uuid,
    pub status: RunStatus,
    pub triggered_by: String,
    pub items_fetched: i32,
    pub items_new: i32,
    pub items_duplicate: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_queued_and_running_are_active() {
        assert!(RunStatus::Queued.is_active());
        assert!(RunStatus::Running.is_active());
        assert!(!RunStatus::Succeeded.is_active());
        assert!(!RunStatus::Failed.is_active());
    }

    #[test]
    fn schedule_type_parses_persisted_form() {
        assert_eq!(
            "WEEKDAYS".parse::<ScheduleType>().unwrap(),
            ScheduleType::Weekdays
        );
        assert!("weekdays".parse::<ScheduleType>().is_err());
    }
}
