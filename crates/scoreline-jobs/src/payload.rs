use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job kinds, one worker pool each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    SourceFetch,
    ImportanceScore,
    ClipPair,
    ScheduledQuery,
    Export,
}

impl JobKind {
    pub const ALL: [JobKind; 5] = [
        JobKind::SourceFetch,
        JobKind::ImportanceScore,
        JobKind::ClipPair,
        JobKind::ScheduledQuery,
        JobKind::Export,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::SourceFetch => "source-fetch",
            JobKind::ImportanceScore => "importance-score",
            JobKind::ClipPair => "clip-pair",
            JobKind::ScheduledQuery => "scheduled-query",
            JobKind::Export => "export",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work item carried through the queue. Serialized with a `type`
/// discriminant, e.g. `{"type":"clip-pair","news_item_id":..,"org_id":..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum JobPayload {
    SourceFetch {
        source_id: Uuid,
        fetch_run_id: Uuid,
        org_id: Uuid,
        triggered_by: String,
    },
    ImportanceScore {
        news_item_id: Uuid,
        org_id: Uuid,
    },
    ClipPair {
        news_item_id: Uuid,
        org_id: Uuid,
    },
    ScheduledQuery {
        query_id: Uuid,
        query_run_id: Uuid,
        org_id: Uuid,
    },
    Export {
        query_run_id: Uuid,
        org_id: Uuid,
    },
}

impl JobPayload {
    #[must_use]
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::SourceFetch { .. } => JobKind::SourceFetch,
            JobPayload::ImportanceScore { .. } => JobKind::ImportanceScore,
            JobPayload::ClipPair { .. } => JobKind::ClipPair,
            JobPayload::ScheduledQuery { .. } => JobKind::ScheduledQuery,
            JobPayload::Export { .. } => JobKind::Export,
        }
    }

    #[must_use]
    pub fn org_id(&self) -> Uuid {
        match self {
            JobPayload::SourceFetch { org_id, .. }
            | JobPayload::ImportanceScore { org_id, .. }
            | JobPayload::ClipPair { org_id, .. }
            | JobPayload::ScheduledQuery { org_id, .. }
            | JobPayload::Export { org_id, .. } => *org_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_with_kebab_type_tag() {
        let payload = JobPayload::ImportanceScore {
            news_item_id: Uuid::nil(),
            org_id: Uuid::nil(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "importance-score");
        assert_eq!(json["news_item_id"], Uuid::nil().to_string());

        let back: JobPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn kind_label_matches_serde_tag() {
        for kind in JobKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.as_str());
        }
    }

    #[test]
    fn payload_reports_its_kind_and_org() {
        let org = Uuid::new_v4();
        let payload = JobPayload::SourceFetch {
            source_id: Uuid::new_v4(),
            fetch_run_id: Uuid::new_v4(),
            org_id: org,
            triggered_by: "cron".to_string(),
        };
        assert_eq!(payload.kind(), JobKind::SourceFetch);
        assert_eq!(payload.org_id(), org);
    }
}
