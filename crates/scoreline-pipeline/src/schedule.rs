//! Next-run computation for sources and saved queries.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use croner::Cron;
use scoreline_core::ScheduleType;

const DEFAULT_INTERVAL_MINUTES: i64 = 60;

/// When a recurring schedule should next fire after `now`.
///
/// `MANUAL` never fires. `HOURLY` uses `refresh_interval_minutes` (60 when
/// not positive). `WEEKDAYS` advances a day at a time, skipping Saturday and
/// Sunday. `CUSTOM` takes the next occurrence of a 5- or 6-field cron
/// expression and falls back to one hour when the expression is missing or
/// unusable.
#[must_use]
pub fn compute_next_run(
    schedule: ScheduleType,
    refresh_interval_minutes: i32,
    cron_expression: Option<&str>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match schedule {
        ScheduleType::Manual => None,
        ScheduleType::Hourly => {
            let minutes = if refresh_interval_minutes > 0 {
                i64::from(refresh_interval_minutes)
            } else {
                DEFAULT_INTERVAL_MINUTES
            };
            Some(now + Duration::minutes(minutes))
        }
        ScheduleType::Daily => Some(now + Duration::days(1)),
        ScheduleType::Weekdays => {
            let mut next = now + Duration::days(1);
            while matches!(next.weekday(), Weekday::Sat | Weekday::Sun) {
                next += Duration::days(1);
            }
            Some(next)
        }
        ScheduleType::Weekly => Some(now + Duration::days(7)),
        ScheduleType::Custom => Some(next_cron_occurrence(cron_expression, now)),
    }
}

fn next_cron_occurrence(expression: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let fallback = now + Duration::minutes(DEFAULT_INTERVAL_MINUTES);
    let Some(expression) = expression.map(str::trim).filter(|e| !e.is_empty()) else {
        tracing::warn!("schedule: custom schedule without a cron expression, using +1h");
        return fallback;
    };

    let parsed = Cron::new(expression).with_seconds_optional().parse();
    match parsed.and_then(|cron| cron.find_next_occurrence(&now, false)) {
        Ok(next) => next,
        Err(e) => {
            tracing::warn!(
                expression,
                error = %e,
                "schedule: unusable cron expression, using +1h"
            );
            fallback
        }
    }
}
