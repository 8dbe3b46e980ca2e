//! Fuzzy matching utilities for lesson lookup
//!
//! Lets "Travel and tourism" find a lesson tagged "travel & tourism".

use strsim::normalized_levenshtein;

/// Result of a fuzzy match with the matched value and score
#[derive(Debug, Clone)]
pub struct FuzzyMatch {
    pub value: String,
    pub score: f64,
}

/// Lowercase, spell out `&`, drop punctuation and collapse whitespace
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase().replace('&', " and ");
    let cleaned: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Find matches in a list of candidates
///
/// Returns up to `n` matches with scores above `cutoff`, best first
pub fn find_matches(
    search_term: &str,
    candidates: &[String],
    n: usize,
    cutoff: f64,
) -> Vec<FuzzyMatch> {
    let search = normalize_text(search_term);

    let mut matches: Vec<FuzzyMatch> = candidates
        .iter()
        .filter_map(|candidate| {
            let normalized = normalize_text(candidate);
            let score = if normalized == search {
                1.0
            } else {
                normalized_levenshtein(&search, &normalized)
            };
            (score >= cutoff).then(|| FuzzyMatch {
                value: candidate.clone(),
                score,
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(n);
    matches
}

/// Find the best match above a minimum score
pub fn find_best_match(
    search_term: &str,
    candidates: &[String],
    cutoff: f64,
) -> Option<FuzzyMatch> {
    find_matches(search_term, candidates, 1, cutoff)
        .into_iter()
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("Food & Dining"), "food and dining");
        assert_eq!(normalize_text("  Agreement/Disagreement "), "agreement disagreement");
    }

    #[test]
    fn test_find_matches_prefers_exact() {
        let candidates = vec![
            "travel and tourism".to_string(),
            "travel".to_string(),
            "grammar".to_string(),
        ];

        let matches = find_matches("Travel & Tourism", &candidates, 5, 0.5);
        assert!(!matches.is_empty());
        assert_eq!(matches[0].value, "travel and tourism");
        assert_eq!(matches[0].score, 1.0);
    }

    #[test]
    fn test_find_best_match_tolerates_typos() {
        let candidates = vec!["subjunctive".to_string(), "past tense".to_string()];

        let best = find_best_match("subjunctiv", &candidates, 0.7);
        assert_eq!(best.map(|m| m.value), Some("subjunctive".to_string()));
        assert!(find_best_match("astronomy", &candidates, 0.7).is_none());
    }
}
