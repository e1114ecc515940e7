//! Source authority lookup by display name.

use regex::Regex;

/// Authority assigned to sources that match no rule, or have no name.
pub const DEFAULT_AUTHORITY: f64 = 0.5;

/// Display-name patterns in evaluation order. The first match wins.
const DEFAULT_RULES: &[(&str, f64)] = &[
    (r"espn|nfl\.com|nba\.com|mlb\.com|nhl\.com", 0.95),
    (r"the athletic|\bathletic\b", 0.9),
    (r"bleacher report|\bbr\b", 0.85),
    (r"\bcbs\b|cbs sports", 0.85),
    (r"\bfox\b|fox sports", 0.85),
    (r"\bnbc\b|nbc sports", 0.85),
    (
        r"draftkings|fanduel|betmgm|caesars|pointsbet|action network|covers",
        0.8,
    ),
    (r"yahoo", 0.8),
    (r"twitter|^x$|\bx\.com\b", 0.7),
    (r"reddit", 0.5),
];

/// Ordered `(pattern, authority)` table evaluated against a source name.
#[derive(Debug, Clone)]
pub struct SourceAuthority {
    rules: Vec<(Regex, f64)>,
    default: f64,
}

impl SourceAuthority {
    /// Build a table from compiled rules. Patterns should be case-insensitive
    /// if the caller wants case-insensitive matching.
    #[must_use]
    pub fn new(rules: Vec<(Regex, f64)>, default: f64) -> Self {
        Self { rules, default }
    }

    /// Authority for `source_name`, or the default when absent or unmatched.
    #[must_use]
    pub fn score(&self, source_name: Option<&str>) -> f64 {
        let Some(name) = source_name.map(str::trim).filter(|n| !n.is_empty()) else {
            return self.default;
        };

        self.rules
            .iter()
            .find(|(re, _)| re.is_match(name))
            .map_or(self.default, |(_, authority)| *authority)
    }
}

impl Default for SourceAuthority {
    fn default() -> Self {
        let rules = DEFAULT_RULES
            .iter()
            .map(|(pattern, authority)| {
                let re = Regex::new(&format!("(?i){pattern}")).expect("valid authority regex");
                (re, *authority)
            })
            .collect();
        Self::new(rules, DEFAULT_AUTHORITY)
    }
}
