use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::news::Sport;
use crate::{teams_data, ConfigError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamEntry {
    pub name: String,
    pub city: String,
    pub abbreviation: String,
}

impl TeamEntry {
    fn from_row(&(name, city, abbreviation): &(&str, &str, &str)) -> Self {
        Self {
            name: name.to_string(),
            city: city.to_string(),
            abbreviation: abbreviation.to_string(),
        }
    }

    /// The team name without its city, e.g. `Chiefs` for `Kansas City Chiefs`.
    #[must_use]
    pub fn nickname(&self) -> &str {
        self.name
            .strip_prefix(self.city.as_str())
            .map(str::trim)
            .filter(|rest| !rest.is_empty())
            .unwrap_or(self.name.as_str())
    }
}

/// Per-sport team tables used by entity extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamDictionary {
    pub teams: BTreeMap<Sport, Vec<TeamEntry>>,
}

impl TeamDictionary {
    /// The built-in NFL, NBA, MLB and NHL tables.
    #[must_use]
    pub fn builtin() -> Self {
        let mut teams = BTreeMap::new();
        for (sport, rows) in [
            (Sport::Nfl, teams_data::NFL),
            (Sport::Nba, teams_data::NBA),
            (Sport::Mlb, teams_data::MLB),
            (Sport::Nhl, teams_data::NHL),
        ] {
            teams.insert(sport, rows.iter().map(TeamEntry::from_row).collect());
        }
        Self { teams }
    }

    /// Teams for one sport; empty when the sport has no table.
    #[must_use]
    pub fn for_sport(&self, sport: Sport) -> &[TeamEntry] {
        self.teams.get(&sport).map_or(&[], Vec::as_slice)
    }

    /// Every team across every sport.
    pub fn all(&self) -> impl Iterator<Item = &TeamEntry> {
        self.teams.values().flatten()
    }
}

impl Default for TeamDictionary {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Load and validate a team dictionary from a YAML file.
///
/// The file has the same shape as [`TeamDictionary`]: a `teams` map from
/// sport (`NFL`, `NBA`, ...) to a list of `{name, city, abbreviation}`.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_teams(path: &Path) -> Result<TeamDictionary, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TeamsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let dictionary: TeamDictionary =
        serde_yaml::from_str(&content).map_err(ConfigError::TeamsFileParse)?;

    validate_teams(&dictionary)?;

    Ok(dictionary)
}

fn validate_teams(dictionary: &TeamDictionary) -> Result<(), ConfigError> {
    for (sport, teams) in &dictionary.teams {
        let mut seen_names = HashSet::new();

        for team in teams {
            if team.name.trim().is_empty() || team.city.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "{sport} team name and city must be non-empty"
                )));
            }

            if team.abbreviation.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "{sport} team '{}' has an empty abbreviation",
                    team.name
                )));
            }

            if !seen_names.insert(team.name.to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate {sport} team name: '{}'",
                    team.name
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "teams_test.rs"]
mod tests;
