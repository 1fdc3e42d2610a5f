// Field-specific extraction for ID card text
use crate::models::{ExtractionStrategy, NameCandidate};
use crate::processing::text_correction::{
    clean_name_text, collapse_whitespace, repair_substitutions,
};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::collections::HashSet;

pub const INSTITUTION_NAME: &str = "SRM Institute of Science and Technology";

lazy_static! {
    // "Name : VISHAL SINGH" and the usual OCR misreadings of the label
    static ref NAME_LABEL_LINE: Regex =
        Regex::new(r"(?i)n[ae]m[ec]?\s*[:;.]\s*[:;.]?\s*([^\n]+)").unwrap();
    static ref NAME_LABEL_REST: Regex = Regex::new(r"(?i)n[ae]m[ec]?\s*[:;.]\s*(.+)").unwrap();
    static ref NAME_LABEL_CAPS: Regex = Regex::new(r"[Nn]ame\s+([A-Z][A-Z\s]{3,})").unwrap();

    // Labels that follow the name on the card; the name value stops before them
    static ref NEXT_SECTION: Regex =
        Regex::new(r"(?i)\s*(programme|program|register|valid)").unwrap();

    static ref NAME_TOKEN: Regex = Regex::new(r"(?i)name").unwrap();
    static ref SEPARATOR: Regex = Regex::new(r"[:;.]").unwrap();
    static ref OTHER_SECTION: Regex =
        Regex::new(r"(?i)programme|program|register|valid|faculty|b\.?tech").unwrap();
    static ref LETTERS_ONLY: Regex = Regex::new(r"^[A-Za-z\s]+$").unwrap();
    static ref TWO_LETTERS: Regex = Regex::new(r"[A-Za-z]{2,}").unwrap();

    // Lines that can never hold the card holder's name
    static ref NON_NAME_LINE: Vec<Regex> = vec![
        Regex::new(r"(?i)programme|register|valid|faculty|engineering|technology|university|college|institute|campus|kattankulathur|chengalp|student|website|email|phone|b\.?tech").unwrap(),
        Regex::new(r"(?i)\b(cse|mech|civil|eee|ece)\b").unwrap(),
        Regex::new(r"(?i)RA\d{4,}").unwrap(),
        Regex::new(r"\d{4,}").unwrap(),
        Regex::new(r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)\b").unwrap(),
        Regex::new(r"(?i)www\.|\.com|\.in|\.edu").unwrap(),
        Regex::new(r"(?i)044-|ph:").unwrap(),
    ];
    static ref UPPERCASE_RUN: Regex = Regex::new(r"[A-Z]{2,}(?:[ \t]+[A-Z]{2,})+").unwrap();

    // Register number shapes, most specific first
    static ref IDENTIFIER_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:Register|Reg)\s*(?:No)?\.?\s*[:;.]\s*(RA\d{6,})").unwrap(),
        Regex::new(r"(?i)(RA\d{10,})").unwrap(),
        Regex::new(r"(?i)(RA\d{8,})").unwrap(),
        Regex::new(r"(?i)([A-Z]{2}\d{10,})").unwrap(),
    ];

    static ref REGISTER_NUMBER: Regex = Regex::new(r"(?i)ra\d{6,}").unwrap();
}

const INSTITUTION_KEYWORDS: [&str; 5] =
    ["srm", "faculty", "engineering", "kattankulathur", "programme"];

/// Collects name candidates and rejects duplicates and unusable values.
struct CandidateSet {
    seen: HashSet<String>,
    candidates: Vec<NameCandidate>,
}

impl CandidateSet {
    fn new() -> Self {
        CandidateSet {
            seen: HashSet::new(),
            candidates: Vec::new(),
        }
    }

    fn push(&mut self, value: &str, strategy: ExtractionStrategy) {
        let normalized = collapse_whitespace(&value.to_uppercase());
        if normalized.chars().count() < 3 || normalized.chars().any(|c| c.is_ascii_digit()) {
            return;
        }
        if self.seen.insert(normalized.clone()) {
            self.candidates.push(NameCandidate {
                value: normalized,
                strategy,
            });
        }
    }
}

pub struct FieldExtractor;

impl FieldExtractor {
    /// Every plausible holder name in the recognized text, strongest strategy first.
    pub fn extract_name_candidates(text: &str) -> Vec<NameCandidate> {
        let fixed = repair_substitutions(text);
        let mut set = CandidateSet::new();

        Self::from_label_patterns(&fixed, &mut set);
        let lines: Vec<&str> = fixed
            .split('\n')
            .map(|line| line.trim())
            .filter(|line| line.len() > 1)
            .collect();
        Self::from_labeled_lines(&lines, &mut set);
        Self::from_uppercase_runs(&lines, &mut set);

        debug!(
            "Name candidates: {:?}",
            set.candidates.iter().map(|c| c.value.as_str()).collect::<Vec<_>>()
        );
        set.candidates
    }

    fn from_label_patterns(text: &str, set: &mut CandidateSet) {
        let label_line = NAME_LABEL_LINE.captures(text).and_then(|c| c.get(1)).map(|m| {
            let value = m.as_str();
            match NEXT_SECTION.find(value) {
                Some(section) => &value[..section.start()],
                None => value,
            }
        });
        let label_rest = NAME_LABEL_REST.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str());
        let label_caps = NAME_LABEL_CAPS.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str());

        for raw in [label_line, label_rest, label_caps].into_iter().flatten() {
            let cleaned = clean_name_text(raw);
            if cleaned.len() >= 3 && TWO_LETTERS.is_match(&cleaned) {
                set.push(&cleaned, ExtractionStrategy::LabelPattern);
            }
        }
    }

    fn from_labeled_lines(lines: &[&str], set: &mut CandidateSet) {
        for (i, line) in lines.iter().enumerate() {
            if !(NAME_TOKEN.is_match(line) && SEPARATOR.is_match(line)) {
                continue;
            }

            let after_separator = SEPARATOR.split(line).skip(1).collect::<Vec<_>>().join(" ");
            let label_value = clean_name_text(after_separator.trim());
            if label_value.len() >= 3 {
                set.push(&label_value, ExtractionStrategy::LabeledLine);
            }

            // Long names wrap onto the following line
            if let Some(next) = lines.get(i + 1) {
                if OTHER_SECTION.is_match(next) {
                    continue;
                }
                let continuation = clean_name_text(next);
                if continuation.len() >= 3 && LETTERS_ONLY.is_match(&continuation) {
                    if label_value.len() >= 3 {
                        set.push(
                            &format!("{} {}", label_value, continuation),
                            ExtractionStrategy::LabeledLine,
                        );
                    }
                    set.push(&continuation, ExtractionStrategy::LabeledLine);
                }
            }
        }
    }

    fn from_uppercase_runs(lines: &[&str], set: &mut CandidateSet) {
        for line in lines {
            if NON_NAME_LINE.iter().any(|pattern| pattern.is_match(line)) {
                continue;
            }
            for run in UPPERCASE_RUN.find_iter(line) {
                let cleaned = clean_name_text(run.as_str());
                if cleaned.len() >= 4 && cleaned.split(' ').any(|word| word.len() >= 2) {
                    set.push(&cleaned, ExtractionStrategy::UppercaseRun);
                }
            }
        }
    }

    /// First register number found, trying the labeled shape before bare digit runs.
    pub fn extract_identifier(text: &str) -> Option<String> {
        IDENTIFIER_PATTERNS.iter().find_map(|pattern| {
            pattern
                .captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_uppercase())
        })
    }

    /// Keyword vote on whether the text comes from the expected institution's card.
    pub fn is_institution_card(text: &str) -> bool {
        let lower = text.to_lowercase();
        let mut votes = INSTITUTION_KEYWORDS
            .iter()
            .filter(|keyword| lower.contains(*keyword))
            .count();
        if REGISTER_NUMBER.is_match(text) {
            votes += 1;
        }
        if lower.contains("b.tech") || lower.contains("btech") {
            votes += 1;
        }
        votes >= 2
    }
}
