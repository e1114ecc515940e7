//! Team, player and topic extraction from news text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scoreline_core::{ExtractedEntities, Sport, TeamDictionary};

use crate::topics::extract_topics;

/// `FirstName [M.] LastName[-Hyphenated]`, tolerating apostrophes
/// (`Ja'Marr`, `D'Andre`), inner capitals (`LeBron`) and `Mc`/`Mac` surnames.
static PLAYER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:[A-Z]['’][A-Z][a-z]+|[A-Z][a-z]+(?:[A-Z][a-z]+|['’][A-Z]?[a-z]+)?)(?:\s+[A-Z]\.)?\s+(?:[A-Z]['’][A-Z][a-z]+|(?:Ma?c)?[A-Z][a-z]+)(?:-[A-Z][a-z]+)?\b",
    )
    .expect("valid player regex")
});

/// Capitalized phrases that look like names but are not players.
const DEFAULT_FALSE_POSITIVES: &[&str] = &[
    "Breaking News",
    "Super Bowl",
    "World Series",
    "Stanley Cup",
    "Pro Bowl",
    "All Star",
    "Monday Night",
    "Sunday Night",
    "Thursday Night",
    "Night Football",
    "Opening Day",
    "Trade Deadline",
    "Free Agency",
    "Free Agent",
    "Head Coach",
    "General Manager",
    "Spring Training",
    "Training Camp",
    "March Madness",
    "Final Four",
    "Wild Card",
    "Power Rankings",
    "Mock Draft",
    "Injury Report",
    "Fantasy Football",
    "Sports Illustrated",
    "Bleacher Report",
    "Associated Press",
    "United States",
    "Just In",
    "Happening Now",
    "Hall Of Fame",
    "Game Time",
    "Eastern Conference",
    "Western Conference",
];

/// Extracts teams, players and topics using an injected team dictionary.
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    teams: TeamDictionary,
    false_positives: HashSet<String>,
    /// Lowercased full names, cities and nicknames across every sport.
    team_words: HashSet<String>,
}

impl EntityExtractor {
    #[must_use]
    pub fn new(teams: TeamDictionary) -> Self {
        let mut team_words = HashSet::new();
        for team in teams.all() {
            team_words.insert(team.name.to_lowercase());
            team_words.insert(team.city.to_lowercase());
            team_words.insert(team.nickname().to_lowercase());
        }

        Self {
            teams,
            false_positives: DEFAULT_FALSE_POSITIVES
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            team_words,
        }
    }

    /// Adds phrases to the false-positive list used by player extraction.
    #[must_use]
    pub fn with_false_positives<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.false_positives
            .extend(phrases.into_iter().map(|p| p.as_ref().to_lowercase()));
        self
    }

    /// Extract all entities from an item's headline and body.
    #[must_use]
    pub fn extract(&self, headline: &str, content: &str, sport: Sport) -> ExtractedEntities {
        let text = format!("{headline} {content}");
        ExtractedEntities {
            teams: self.extract_teams(&text, sport),
            players: self.extract_players(&text),
            topics: extract_topics(&text),
        }
    }

    /// Full names of the `sport` teams mentioned in `text`, in dictionary order.
    ///
    /// Full names and cities match case-insensitively anywhere in the text;
    /// abbreviations only match as a whole uppercase word.
    #[must_use]
    pub fn extract_teams(&self, text: &str, sport: Sport) -> Vec<String> {
        let lowered = text.to_lowercase();
        let upper_words: HashSet<&str> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let mut found = Vec::new();
        for team in self.teams.for_sport(sport) {
            let mentioned = lowered.contains(&team.name.to_lowercase())
                || (!team.city.is_empty() && lowered.contains(&team.city.to_lowercase()))
                || (!team.abbreviation.is_empty()
                    && upper_words.contains(team.abbreviation.as_str()));
            if mentioned && !found.contains(&team.name) {
                found.push(team.name.clone());
            }
        }
        found
    }

    /// Player-like names in order of first appearance.
    #[must_use]
    pub fn extract_players(&self, text: &str) -> Vec<String> {
        let mut players: Vec<String> = Vec::new();
        let mut pos = 0;

        while let Some(m) = PLAYER_RE.find_at(text, pos) {
            let candidate = m.as_str().split_whitespace().collect::<Vec<_>>().join(" ");

            pos = m.end();
            if !self.is_rejected(&candidate) && !players.contains(&candidate) {
                players.push(candidate);
            }
        }

        players
    }

    /// Only whole-candidate matches are rejected, so names that share a word
    /// with a team or a common word ("Jazz Chisholm", "Will Levis") survive.
    fn is_rejected(&self, candidate: &str) -> bool {
        let lowered = candidate.to_lowercase();
        self.false_positives.contains(&lowered) || self.team_words.contains(&lowered)
    }
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new(TeamDictionary::builtin())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use scoreline_core::TeamEntry;

    use super::*;

    fn extractor() -> EntityExtractor {
        EntityExtractor::default()
    }

    #[test]
    fn finds_team_by_full_name() {
        let teams = extractor().extract_teams("The Kansas City Chiefs won again", Sport::Nfl);
        assert_eq!(teams, vec!["Kansas City Chiefs"]);
    }

    #[test]
    fn finds_team_by_city_case_insensitively() {
        let teams = extractor().extract_teams("big night in buffalo", Sport::Nfl);
        assert_eq!(teams, vec!["Buffalo Bills"]);
    }

    #[test]
    fn abbreviation_requires_whole_uppercase_word() {
        let e = extractor();
        assert_eq!(e.extract_teams("KC rolls on", Sport::Nfl), vec!["Kansas City Chiefs"]);
        assert!(e.extract_teams("The kcal count was high", Sport::Nfl).is_empty());
        assert!(e.extract_teams("Backfield depth", Sport::Nfl).is_empty());
    }

    #[test]
    fn teams_only_come_from_requested_sport() {
        let teams = extractor().extract_teams("Boston Celtics beat the Lakers", Sport::Nfl);
        assert!(teams.is_empty());
    }

    #[test]
    fn teams_are_deduplicated_in_dictionary_order() {
        let teams = extractor().extract_teams(
            "Dallas Cowboys host Arizona. Dallas fans expect a win over ARI.",
            Sport::Nfl,
        );
        assert_eq!(teams, vec!["Arizona Cardinals", "Dallas Cowboys"]);
    }

    #[test]
    fn extracts_simple_player_names() {
        let players = extractor().extract_players("Patrick Mahomes found Travis Kelce late.");
        assert_eq!(players, vec!["Patrick Mahomes", "Travis Kelce"]);
    }

    #[test]
    fn extracts_middle_initial_and_hyphenated_names() {
        let players =
            extractor().extract_players("Michael A. Smith and Jaxon Smith-Njigba connected twice");
        assert_eq!(players, vec!["Michael A. Smith", "Jaxon Smith-Njigba"]);
    }

    #[test]
    fn extracts_apostrophe_and_mc_names() {
        let players = extractor()
            .extract_players("Ja'Marr Chase outran D'Andre Swift and Christian McCaffrey");
        assert_eq!(
            players,
            vec!["Ja'Marr Chase", "D'Andre Swift", "Christian McCaffrey"]
        );
    }

    #[test]
    fn rejects_false_positive_phrases() {
        let players = extractor().extract_players("Breaking News: Super Bowl tickets sold out");
        assert!(players.is_empty(), "got {players:?}");
    }

    #[test]
    fn rejects_team_names_and_cities() {
        let players = extractor().extract_players("Kansas City and Green Bay both won");
        assert!(players.is_empty(), "got {players:?}");
    }

    #[test]
    fn rejected_phrase_does_not_swallow_following_name() {
        let players = extractor().extract_players("Super Bowl Patrick Mahomes is questionable");
        assert_eq!(players, vec!["Patrick Mahomes"]);
    }

    #[test]
    fn names_sharing_a_word_with_teams_or_common_words_are_kept() {
        let e = extractor();
        assert_eq!(
            e.extract_players("Will Levis throws for 300 yards"),
            vec!["Will Levis"]
        );
        assert_eq!(
            e.extract_players("Jazz Chisholm homers twice"),
            vec!["Jazz Chisholm"]
        );
        assert_eq!(
            e.extract_players("Magic Johnson attends game"),
            vec!["Magic Johnson"]
        );
    }

    #[test]
    fn nickname_alone_as_candidate_is_rejected() {
        assert!(extractor().extract_players("Red Sox rally late").is_empty());
    }

    #[test]
    fn players_are_deduplicated() {
        let players = extractor()
            .extract_players("Josh Allen threw for 300 yards. Later, Josh Allen ran for two scores.");
        assert_eq!(players, vec!["Josh Allen"]);
    }

    #[test]
    fn extra_false_positives_are_honoured() {
        let e = extractor().with_false_positives(["Star Receiver"]);
        assert!(e.extract_players("Star Receiver traded").is_empty());
    }

    #[test]
    fn no_matches_is_empty_result() {
        let entities = extractor().extract("", "", Sport::Nba);
        assert!(entities.is_empty());
    }

    #[test]
    fn extract_combines_headline_and_content() {
        let entities = extractor().extract(
            "Lakers trade for veteran guard",
            "LeBron James welcomed the deal in Los Angeles.",
            Sport::Nba,
        );
        assert!(entities.teams.contains(&"Los Angeles Lakers".to_string()));
        assert!(entities.players.contains(&"LeBron James".to_string()));
        assert_eq!(entities.topics.first().map(String::as_str), Some("trade"));
    }

    #[test]
    fn substitute_dictionary_is_used() {
        let mut teams = BTreeMap::new();
        teams.insert(
            Sport::Nfl,
            vec![TeamEntry {
                name: "Springfield Atoms".to_string(),
                city: "Springfield".to_string(),
                abbreviation: "SPA".to_string(),
            }],
        );
        let e = EntityExtractor::new(TeamDictionary { teams });
        assert_eq!(
            e.extract_teams("SPA clinch the division", Sport::Nfl),
            vec!["Springfield Atoms"]
        );
        assert!(e.extract_teams("Kansas City Chiefs", Sport::Nfl).is_empty());
    }
}
