// OCR text repair for ID card names.
// Fixes visually confusable characters in letter context, then strips card noise
// (watermark fragments, institution name fragments, section headers, stray glyphs).

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Watermark readings of the institution's short name
    static ref WATERMARK_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\b[OC]?SRM\b").unwrap(),
        Regex::new(r"(?i)\bSR[MNW]\b").unwrap(),
        Regex::new(r"(?i)\bOS[RM][MW]?\b").unwrap(),
        Regex::new(r"(?i)\bCSR[MW]?\b").unwrap(),
    ];

    // Institution name fragments that bleed into the name line
    static ref INSTITUTION_FRAGMENTS: Vec<Regex> = vec![
        Regex::new(r"(?i)institute\s*(of)?").unwrap(),
        Regex::new(r"(?i)science").unwrap(),
        Regex::new(r"(?i)technology").unwrap(),
    ];

    static ref SECTION_HEADERS: Regex =
        Regex::new(r"(?i)\b(programme|program|register|valid|faculty|student|identity|card)\b").unwrap();

    // Register numbers and other long digit runs, with any short letter prefix
    static ref ID_LIKE_TOKEN: Regex = Regex::new(r"\b[A-Za-z]{0,3}\d{4,}\w*\b").unwrap();
    static ref STRAY_SYMBOL: Regex = Regex::new(r"\b[^a-zA-Z\s]\b").unwrap();
    static ref STRAY_LETTER: Regex = Regex::new(r"\b[a-zA-Z]\b").unwrap();
    static ref DIGITS: Regex = Regex::new(r"[0-9]").unwrap();
}

/// Digit-like glyphs and the letter they stand for when touching an uppercase letter.
const DIGIT_CONFUSIONS: [(char, char); 3] = [('0', 'O'), ('5', 'S'), ('8', 'B')];

fn touches_uppercase(chars: &[char], index: usize) -> bool {
    let before = index.checked_sub(1).and_then(|i| chars.get(i));
    let after = chars.get(index + 1);
    before.map_or(false, |c| c.is_ascii_uppercase())
        || after.map_or(false, |c| c.is_ascii_uppercase())
}

/// Replace confusable glyphs that sit next to an uppercase letter.
///
/// `|`, `!`, `l` and `1` become `I`; `0`, `5` and `8` become `O`, `S` and `B`.
/// Glyphs with no uppercase neighbour are left alone so numbers survive.
pub fn repair_substitutions(text: &str) -> String {
    let original: Vec<char> = text.chars().collect();
    let mut chars: Vec<char> = original
        .iter()
        .enumerate()
        .map(|(i, &c)| match c {
            '|' | '!' | 'l' | '1' if touches_uppercase(&original, i) => 'I',
            _ => c,
        })
        .collect();

    for (digit, letter) in DIGIT_CONFUSIONS {
        let snapshot = chars.clone();
        for (i, c) in chars.iter_mut().enumerate() {
            if *c == digit && touches_uppercase(&snapshot, i) {
                *c = letter;
            }
        }
    }

    chars.into_iter().collect()
}

/// Remove everything from a name fragment that cannot be part of a person's name.
pub fn clean_name_text(text: &str) -> String {
    let mut cleaned = text.to_string();
    for pattern in WATERMARK_PATTERNS.iter().chain(INSTITUTION_FRAGMENTS.iter()) {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }
    cleaned = SECTION_HEADERS.replace_all(&cleaned, "").into_owned();
    cleaned = ID_LIKE_TOKEN.replace_all(&cleaned, "").into_owned();
    cleaned = STRAY_SYMBOL.replace_all(&cleaned, "").into_owned();
    cleaned = DIGITS.replace_all(&cleaned, "").into_owned();
    cleaned = STRAY_LETTER.replace_all(&cleaned, "").into_owned();

    // Tokens without a single letter are punctuation debris
    cleaned
        .split_whitespace()
        .filter(|word| word.chars().any(|c| c.is_ascii_alphabetic()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse runs of whitespace to single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
