//! Fuzzy display-name scoring
//!
//! Scores a vendor-reported display name against an employee full name using
//! word-set Jaccard similarity (70% weight) plus substring-containment
//! partial-word scoring (30% weight). Scores are in 0.0..=1.0.

use seatsync_domain::constants::{FUZZY_PARTIAL_WEIGHT, FUZZY_WORD_OVERLAP_WEIGHT};

/// Similarity between two person names.
pub fn name_similarity(left: &str, right: &str) -> f32 {
    let left_words = tokenize(left);
    let right_words = tokenize(right);

    if left_words.is_empty() || right_words.is_empty() {
        return 0.0;
    }

    let jaccard = jaccard_score(&left_words, &right_words);
    let partial = partial_score(&left_words, &right_words);

    FUZZY_WORD_OVERLAP_WEIGHT * jaccard + FUZZY_PARTIAL_WEIGHT * partial
}

/// Lowercased, deduplicated word set.
fn tokenize(name: &str) -> Vec<String> {
    let mut words: Vec<String> = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect();
    words.sort();
    words.dedup();
    words
}

fn jaccard_score(left: &[String], right: &[String]) -> f32 {
    let intersection = left.iter().filter(|word| right.contains(*word)).count();
    let union = left.len() + right.len() - intersection;

    if union == 0 {
        return 0.0;
    }
    intersection as f32 / union as f32
}

/// Partial credit for words contained inside each other ("rob" / "robert").
///
/// Single-character fragments are ignored; they match almost anything.
fn partial_score(left: &[String], right: &[String]) -> f32 {
    let contains = |word: &str, other: &str| {
        word.len() > 1 && other.len() > 1 && (word.contains(other) || other.contains(word))
    };

    let left_hits = left
        .iter()
        .filter(|word| right.iter().any(|other| contains(word.as_str(), other.as_str())))
        .count();
    let right_hits = right
        .iter()
        .filter(|word| left.iter().any(|other| contains(word.as_str(), other.as_str())))
        .count();

    (left_hits + right_hits) as f32 / (left.len() + right.len()) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_names_score_one() {
        let score = name_similarity("Ada Lovelace", "Ada Lovelace");
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn case_and_punctuation_do_not_matter() {
        let score = name_similarity("ada.lovelace", "Ada Lovelace");
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn partial_word_containment_gets_partial_credit() {
        // "rob" is contained in "robert": no exact word overlap, but the
        // partial component is non-zero.
        let score = name_similarity("Rob Banks", "Robert Banks");
        assert!(score > 0.5, "score was {score}");
        assert!(score < 1.0, "score was {score}");
    }

    #[test]
    fn unrelated_names_score_low() {
        let score = name_similarity("Ada Lovelace", "Grace Hopper");
        assert!(score < 0.1, "score was {score}");
    }

    #[test]
    fn empty_names_score_zero() {
        assert_eq!(name_similarity("", "Ada Lovelace"), 0.0);
        assert_eq!(name_similarity("Ada", ""), 0.0);
        assert_eq!(name_similarity("...", "Ada"), 0.0);
    }

    #[test]
    fn word_order_is_irrelevant() {
        let forward = name_similarity("Ada Lovelace", "Lovelace Ada");
        assert!((forward - 1.0).abs() < 1e-6);
    }
}
