use std::path::PathBuf;

use super::*;

fn write_temp_yaml(contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("scoreline-teams-{}.yaml", uuid::Uuid::new_v4()));
    std::fs::write(&path, contents).expect("write temp teams file");
    path
}

#[test]
fn builtin_tables_cover_four_leagues() {
    let dict = TeamDictionary::builtin();
    assert_eq!(dict.for_sport(Sport::Nfl).len(), 32);
    assert_eq!(dict.for_sport(Sport::Nba).len(), 30);
    assert_eq!(dict.for_sport(Sport::Mlb).len(), 30);
    assert_eq!(dict.for_sport(Sport::Nhl).len(), 32);
}

#[test]
fn builtin_tables_pass_validation() {
    assert!(validate_teams(&TeamDictionary::builtin()).is_ok());
}

#[test]
fn nickname_strips_city_prefix() {
    let dict = TeamDictionary::builtin();
    let chiefs = dict
        .for_sport(Sport::Nfl)
        .iter()
        .find(|t| t.abbreviation == "KC")
        .unwrap();
    assert_eq!(chiefs.nickname(), "Chiefs");
}

#[test]
fn nickname_falls_back_to_full_name_without_city_prefix() {
    let team = TeamEntry {
        name: "Athletics".to_string(),
        city: "Sacramento".to_string(),
        abbreviation: "ATH".to_string(),
    };
    assert_eq!(team.nickname(), "Athletics");
}

#[test]
fn load_teams_reads_yaml_file() {
    let path = write_temp_yaml(
        "teams:\n  NFL:\n    - name: Buffalo Bills\n      city: Buffalo\n      abbreviation: BUF\n",
    );
    let dict = load_teams(&path).expect("valid teams file");
    assert_eq!(dict.for_sport(Sport::Nfl).len(), 1);
    assert!(dict.for_sport(Sport::Nba).is_empty());
    std::fs::remove_file(path).ok();
}

#[test]
fn load_teams_rejects_duplicate_names() {
    let path = write_temp_yaml(
        "teams:\n  NBA:\n    - name: Miami Heat\n      city: Miami\n      abbreviation: MIA\n    - name: miami heat\n      city: Miami\n      abbreviation: MIH\n",
    );
    let result = load_teams(&path);
    assert!(
        matches!(result, Err(ConfigError::Validation(ref msg)) if msg.contains("duplicate")),
        "expected duplicate validation error, got: {result:?}"
    );
    std::fs::remove_file(path).ok();
}

#[test]
fn load_teams_reports_missing_file() {
    let result = load_teams(Path::new("/nonexistent/teams.yaml"));
    assert!(matches!(result, Err(ConfigError::TeamsFileIo { .. })));
}
