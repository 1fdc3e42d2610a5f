use crate::models::{MatchResult, NameCandidate};
use log::debug;
use strsim::levenshtein;

/// Word pair similarity at which two words count as the same word.
const WORD_MATCH: f64 = 0.6;
/// Floor granted when one word is a prefix of the other (truncated OCR output).
const PREFIX_FLOOR: f64 = 0.85;
const WORD_WEIGHT: f64 = 0.95;
const FIRST_NAME_STRONG: f64 = 0.75;
const FIRST_NAME_WEAK: f64 = 0.70;
const FIRST_NAME_FLOOR: f64 = 0.80;
const FIRST_NAME_WEIGHT: f64 = 0.9;
const CONTAINMENT_SCORE: f64 = 0.85;
const MATCH_THRESHOLD: f64 = 0.60;

/// Lowercase, keep ASCII letters and spaces, collapse whitespace.
pub fn normalize_name(name: &str) -> String {
    let letters: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_whitespace())
        .collect();
    letters.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 1 - edit distance / longer length.
fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

fn word_similarity(a: &str, b: &str) -> f64 {
    let sim = similarity(a, b);
    if a.starts_with(b) || b.starts_with(a) {
        sim.max(PREFIX_FLOOR)
    } else {
        sim
    }
}

/// Greedy one-to-one alignment of profile words onto candidate words.
fn count_matched_words(profile_words: &[&str], candidate_words: &[&str]) -> usize {
    let mut used = vec![false; candidate_words.len()];
    let mut matched = 0;

    for word in profile_words {
        let mut best_sim = 0.0;
        let mut best_idx = None;
        for (j, candidate) in candidate_words.iter().enumerate() {
            if used[j] {
                continue;
            }
            let sim = word_similarity(word, candidate);
            if sim > best_sim {
                best_sim = sim;
                best_idx = Some(j);
            }
        }

        if let Some(j) = best_idx {
            if best_sim >= WORD_MATCH {
                used[j] = true;
                matched += 1;
            }
        }
    }

    matched
}

/// Compare a profile name against a name read off a card.
///
/// Four signals are combined by taking the maximum: full-string edit similarity,
/// word-level alignment, first-name similarity and containment. Any one strong
/// signal is enough, since OCR noise rarely damages every part of a name at once.
pub fn match_names(profile_name: &str, candidate_name: &str) -> MatchResult {
    let a = normalize_name(profile_name);
    let b = normalize_name(candidate_name);

    if a.is_empty() || b.is_empty() {
        return MatchResult::no_match();
    }
    if a == b {
        return MatchResult {
            is_match: true,
            similarity: 1.0,
            candidate: None,
        };
    }

    let full_similarity = similarity(&a, &b);

    let a_words: Vec<&str> = a.split(' ').filter(|w| w.len() >= 2).collect();
    let b_words: Vec<&str> = b.split(' ').filter(|w| w.len() >= 2).collect();

    let matched_words = count_matched_words(&a_words, &b_words);
    let total_words = a_words.len().max(b_words.len());
    let word_level = if total_words > 0 {
        matched_words as f64 / total_words as f64
    } else {
        0.0
    };

    let first_name_sim = match a_words.first() {
        Some(first) if first.len() >= 3 => b_words
            .iter()
            .map(|word| word_similarity(first, word))
            .fold(0.0, f64::max),
        _ => 0.0,
    };

    let contains = a.contains(&b)
        || b.contains(&a)
        || a_words.iter().any(|w| {
            w.len() >= 3 && b_words.iter().any(|bw| bw.contains(w) || w.contains(bw))
        });

    let first_name_score = if first_name_sim >= FIRST_NAME_STRONG {
        FIRST_NAME_FLOOR.max(first_name_sim * FIRST_NAME_WEIGHT)
    } else {
        0.0
    };
    let combined = full_similarity
        .max(word_level * WORD_WEIGHT)
        .max(first_name_score)
        .max(if contains { CONTAINMENT_SCORE } else { 0.0 });

    let is_match = combined >= MATCH_THRESHOLD
        || (first_name_sim >= FIRST_NAME_WEAK && matched_words >= 1)
        || matched_words >= 2
        || contains;

    MatchResult {
        is_match,
        similarity: combined.min(1.0) as f32,
        candidate: None,
    }
}

/// Compare against every candidate and keep the most similar one.
///
/// Ties keep the earlier candidate. With no candidates the result is a
/// non-match with similarity 0.
pub fn best_match(profile_name: &str, candidates: &[NameCandidate]) -> MatchResult {
    let mut best: Option<MatchResult> = None;

    for candidate in candidates {
        let mut result = match_names(profile_name, &candidate.value);
        debug!(
            "Candidate {:?} -> similarity {:.0}%",
            candidate.value,
            result.similarity * 100.0
        );
        result.candidate = Some(candidate.value.clone());
        if best.as_ref().map_or(true, |b| result.similarity > b.similarity) {
            best = Some(result);
        }
    }

    best.unwrap_or_else(MatchResult::no_match)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractionStrategy;
    use crate::processing::text_correction::repair_substitutions;

    #[test]
    fn test_exact_match() {
        let result = match_names("Vishal Singh", "VISHAL SINGH");
        assert!(result.is_match);
        assert_eq!(result.similarity, 1.0);
    }

    #[test]
    fn test_substituted_digit() {
        let raw = match_names("Vishal Singh", "VI5HAL SINGH");
        assert!(raw.is_match);
        assert!(raw.similarity >= 0.85, "similarity {}", raw.similarity);

        let repaired = match_names("Vishal Singh", &repair_substitutions("VI5HAL SINGH"));
        assert!(repaired.is_match);
        assert_eq!(repaired.similarity, 1.0);
    }

    #[test]
    fn test_unrelated_text() {
        let result = match_names("Vishal Singh", "RANDOM TEXT");
        assert!(!result.is_match);
        assert!(result.similarity < 0.5, "similarity {}", result.similarity);
    }

    #[test]
    fn test_containment() {
        let result = match_names("Ananya", "ANANYA S");
        assert!(result.is_match);
        assert!(result.similarity >= 0.85);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(match_names("", "VISHAL"), MatchResult::no_match());
        assert_eq!(match_names("Vishal", "1234 !!"), MatchResult::no_match());
    }

    #[test]
    fn test_truncated_surname() {
        // OCR dropped the end of the surname
        let result = match_names("Priya Raghunathan", "PRIYA RAGHU");
        assert!(result.is_match);
        assert!(result.similarity >= 0.8);
    }

    #[test]
    fn test_garbled_surname_keeps_first_name() {
        let result = match_names("Karthik Subramanian", "KARTHIK SWBRNMQX");
        assert!(result.is_match);
        assert!(result.similarity >= 0.8);
    }

    #[test]
    fn test_reordered_words() {
        let result = match_names("Singh Vishal", "VISHAL SINGH");
        assert!(result.is_match);
        assert!((result.similarity - 0.95).abs() < 1e-6);
    }

    fn candidate(value: &str) -> NameCandidate {
        NameCandidate {
            value: value.to_string(),
            strategy: ExtractionStrategy::LabelPattern,
        }
    }

    #[test]
    fn test_best_match_prefers_closest_candidate() {
        let candidates = vec![candidate("FACULTY ENGINEERING"), candidate("VISHAL SINGH")];
        let result = best_match("Vishal Singh", &candidates);
        assert!(result.is_match);
        assert_eq!(result.candidate.as_deref(), Some("VISHAL SINGH"));
        assert_eq!(result.similarity, 1.0);
    }

    #[test]
    fn test_best_match_ties_keep_first() {
        let candidates = vec![candidate("ANANYA S"), candidate("ANANYA R")];
        let result = best_match("Ananya", &candidates);
        assert_eq!(result.candidate.as_deref(), Some("ANANYA S"));
    }

    #[test]
    fn test_best_match_without_candidates() {
        assert_eq!(best_match("Vishal Singh", &[]), MatchResult::no_match());
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Dr. O'Neil-Smith \n Jr "), "dr oneilsmith jr");
        assert_eq!(normalize_name("1234"), "");
    }
}
