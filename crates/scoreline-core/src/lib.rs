//! Shared domain types and configuration for Scoreline.

pub mod app_config;
pub mod clips;
pub mod config;
pub mod games;
pub mod news;
pub mod queries;
pub mod sources;
pub mod teams;

mod teams_data;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use clips::{ClipMatch, ClipMatchStatus};
pub use config::{load_app_config, load_app_config_from_env};
pub use games::{GameOutcome, GameResult, GameResultDraft, OddsDraft, OddsSnapshot, UpcomingGame};
pub use news::{ExtractedEntities, NewsItem, NewsItemDraft, NewsType, ScoreBreakdown, Sport};
pub use queries::{QueryRun, SavedQuery};
pub use sources::{RunStatus, ScheduleType, Source, SourceFetchRun, SourceStatus};
pub use teams::{load_teams, TeamDictionary, TeamEntry};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read teams file {path}: {source}")]
    TeamsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse teams file: {0}")]
    TeamsFileParse(#[source] serde_yaml::Error),

    #[error("teams file validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid {kind}: {value}")]
    InvalidEnum { kind: &'static str, value: String },
}

/// Implements `as_str`, `Display`, and `FromStr` for a fieldless enum whose
/// persisted form is a fixed upper-snake-case string.
macro_rules! text_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err($crate::CoreError::InvalidEnum {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub(crate) use text_enum;
