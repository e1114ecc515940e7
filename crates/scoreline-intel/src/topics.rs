//! Topic tagging through an ordered list of `(pattern, topic)` rules.

use std::sync::LazyLock;

use regex::Regex;

/// Rule patterns in evaluation order. Output topics follow this order.
const TOPIC_PATTERNS: &[(&str, &str)] = &[
    (
        r"\b(trade[sd]?|trading|acquire[sd]?|deal(?:t)? to|swap)\b",
        "trade",
    ),
    (
        r"\b(injur(?:y|ies|ed)|hurt|sprain(?:ed)?|torn|fracture[sd]?|concussion|injured reserve|\bIR\b)",
        "injury",
    ),
    (
        r"\b(sign(?:s|ed|ing)?|contract|extension|agree[sd]? to terms|free agen(?:t|cy))\b",
        "signing",
    ),
    (r"\b(draft(?:ed)?|mock draft|draft pick|first[- ]round pick)\b", "draft"),
    (r"\b(retire[sd]?|retirement|hang(?:s)? it up)\b", "retirement"),
    (r"\b(suspend(?:ed)?|suspension|banned|fined)\b", "suspension"),
    (
        r"\b(coach(?:es|ing)?|head coach|coordinator|fired|hire[sd]?|manager)\b",
        "coaching",
    ),
    (
        r"\b(playoffs?|postseason|wild[- ]card|seed(?:ing)?|clinch(?:es|ed)?)\b",
        "playoffs",
    ),
    (
        r"\b(super bowl|world series|stanley cup|nba finals|championship|title game)\b",
        "championship",
    ),
    (
        r"\b(record|milestone|career[- ]high|all[- ]time|franchise record|first ever)\b",
        "milestone",
    ),
    (
        r"\b(odds|betting|spread|moneyline|over/under|sportsbook|favorite|underdog)\b",
        "betting",
    ),
    (r"\b(mvp|award|all[- ]star|pro bowl|rookie of the year|honors?)\b", "awards"),
    (
        r"\b(rookie|breakout|emerging|rising star|prospect|sophomore)\b",
        "rising-star",
    ),
    (
        r"\b(controvers(?:y|ial)|scandal|investigation|arrest(?:ed)?|lawsuit|allegations?)\b",
        "controversy",
    ),
    (
        r"\b(stats?|statistics|analytics|efficiency|per game|advanced metrics|projection)\b",
        "analytics",
    ),
];

static TOPIC_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    TOPIC_PATTERNS
        .iter()
        .map(|(pattern, topic)| {
            let re = Regex::new(&format!("(?i){pattern}")).expect("valid topic regex");
            (re, *topic)
        })
        .collect()
});

/// Every topic whose rule matches `text`, in rule order.
#[must_use]
pub fn extract_topics(text: &str) -> Vec<String> {
    TOPIC_RULES
        .iter()
        .filter(|(re, _)| re.is_match(text))
        .map(|(_, topic)| (*topic).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_fifteen_rules() {
        assert_eq!(TOPIC_RULES.len(), 15);
    }

    #[test]
    fn empty_text_has_no_topics() {
        assert!(extract_topics("").is_empty());
    }

    #[test]
    fn multiple_topics_follow_rule_order() {
        let topics =
            extract_topics("Lakers trade for injured guard after signing extension talks stall");
        assert_eq!(topics, vec!["trade", "injury", "signing"]);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(extract_topics("SUPER BOWL preview"), vec!["championship"]);
    }

    #[test]
    fn betting_terms_are_tagged() {
        let topics = extract_topics("Moneyline shifts as Chiefs become road underdog");
        assert!(topics.contains(&"betting".to_string()));
    }

    #[test]
    fn unrelated_text_has_no_topics() {
        assert!(extract_topics("A quiet afternoon at the ballpark").is_empty());
    }
}
