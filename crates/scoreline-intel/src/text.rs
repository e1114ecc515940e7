//! Tokenization, headline similarity and content fingerprints.

use std::collections::HashSet;

/// Headlines at or above this Jaccard similarity are treated as the same story.
pub const SIMILARITY_THRESHOLD: f64 = 0.70;

/// Number of content characters folded into a fingerprint.
const FINGERPRINT_CONTENT_CHARS: usize = 500;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// English words too common to carry meaning in a headline comparison.
/// Tokens of two characters or fewer are dropped before this list applies.
pub(crate) const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "his", "how", "its", "may", "new", "now", "off", "see", "who",
    "did", "get", "got", "let", "say", "she", "too", "use", "via", "with", "from", "that",
    "this", "will", "have", "been", "were", "they", "them", "their", "what", "when", "where",
    "which", "while", "about", "after", "before", "into", "over", "than", "then", "there",
    "these", "those", "just", "also", "more", "most", "some", "such", "only", "very", "says",
    "said", "amid", "could", "would", "should",
];

/// Split text into a set of comparable tokens.
///
/// Lowercases, strips punctuation, drops tokens of two characters or fewer
/// and stop words.
#[must_use]
pub fn tokenize(text: &str) -> HashSet<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect();

    cleaned
        .split_whitespace()
        .filter(|token| token.chars().count() > 2)
        .filter(|token| !STOP_WORDS.contains(token))
        .map(ToOwned::to_owned)
        .collect()
}

/// Jaccard similarity of two token sets, `|A ∩ B| / |A ∪ B|`.
///
/// Two empty sets are identical (1.0); one empty set against a non-empty
/// one shares nothing (0.0).
#[must_use]
pub fn token_set_similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;

    #[allow(clippy::cast_precision_loss)]
    let similarity = intersection as f64 / union as f64;
    similarity
}

/// Jaccard similarity between two headlines after tokenization.
#[must_use]
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    token_set_similarity(&tokenize(a), &tokenize(b))
}

/// Fingerprint of an item's text: 32-bit FNV-1a over
/// `lower(headline) + "|" + lower(first 500 chars of content)`, base-36.
#[must_use]
pub fn content_fingerprint(headline: &str, content: &str) -> String {
    let prefix: String = content.chars().take(FINGERPRINT_CONTENT_CHARS).collect();
    let normalized = format!("{}|{}", headline.to_lowercase(), prefix.to_lowercase());
    to_base36(fnv1a_32(normalized.as_bytes()))
}

fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

fn to_base36(mut value: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_drops_short_words_and_stop_words() {
        let tokens = tokenize("The Chiefs are on a roll, and fans love it!");
        assert!(tokens.contains("chiefs"));
        assert!(tokens.contains("roll"));
        assert!(tokens.contains("fans"));
        assert!(tokens.contains("love"));
        assert!(!tokens.contains("the"));
        assert!(!tokens.contains("and"));
        assert!(!tokens.contains("on"));
    }

    #[test]
    fn tokenize_strips_punctuation_inside_words() {
        let tokens = tokenize("record-breaking deal");
        assert!(tokens.contains("recordbreaking"));
    }

    #[test]
    fn similarity_is_symmetric() {
        let pairs = [
            ("Bills trade for star receiver", "Star receiver traded to Bills"),
            ("Lakers win in overtime", "Celtics lose at home"),
            ("", "Something happened"),
        ];
        for (a, b) in pairs {
            assert!((jaccard_similarity(a, b) - jaccard_similarity(b, a)).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn similarity_of_headline_with_itself_is_one() {
        let headline = "Mahomes throws four touchdowns in comeback win";
        assert!((jaccard_similarity(headline, headline) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn two_empty_token_sets_are_identical() {
        assert!((jaccard_similarity("a an of", "to be") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_against_non_empty_is_zero() {
        assert!(jaccard_similarity("", "Chiefs sign linebacker").abs() < f64::EPSILON);
    }

    #[test]
    fn paraphrased_headlines_clear_threshold() {
        let a = "Chiefs sign veteran linebacker to one-year deal";
        let b = "Chiefs sign veteran linebacker to one-year deal Monday";
        assert!(jaccard_similarity(a, b) >= SIMILARITY_THRESHOLD);
    }

    #[test]
    fn fnv1a_matches_reference_vectors() {
        assert_eq!(fnv1a_32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn base36_renders_lowercase_digits() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(u32::MAX), "1z141z3");
    }

    #[test]
    fn fingerprint_ignores_case_and_content_past_500_chars() {
        let body = "x".repeat(500);
        let a = content_fingerprint("Big Trade", &format!("{body} tail one"));
        let b = content_fingerprint("big trade", &format!("{} tail two", body.to_uppercase()));
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_differs_for_different_headlines() {
        assert_ne!(
            content_fingerprint("Bills win", "same body"),
            content_fingerprint("Bills lose", "same body")
        );
    }
}
