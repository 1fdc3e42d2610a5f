use serde::{Deserialize, Serialize};
use std::fmt;

/// Quarter-turn orientation hypothesis for a card photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Search order: upright first, then sideways, then upside-down.
    pub const SEARCH_ORDER: [Rotation; 4] =
        [Rotation::Deg0, Rotation::Deg90, Rotation::Deg270, Rotation::Deg180];

    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    pub fn from_degrees(degrees: u32) -> Option<Rotation> {
        match degrees % 360 {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Preprocessing recipes, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariantKind {
    AdaptiveLargeBlock,
    ContrastOtsu,
    EnhancedGrayscale,
    AdaptiveSmallBlock,
}

impl VariantKind {
    pub const ALL: [VariantKind; 4] = [
        VariantKind::AdaptiveLargeBlock,
        VariantKind::ContrastOtsu,
        VariantKind::EnhancedGrayscale,
        VariantKind::AdaptiveSmallBlock,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            VariantKind::AdaptiveLargeBlock => "adaptive-threshold-large-block",
            VariantKind::ContrastOtsu => "contrast-stretch-otsu",
            VariantKind::EnhancedGrayscale => "enhanced-grayscale",
            VariantKind::AdaptiveSmallBlock => "adaptive-threshold-small-block",
        }
    }

    /// Every recipe except the enhanced grayscale one yields a {0, 255} buffer.
    pub fn is_binary(&self) -> bool {
        !matches!(self, VariantKind::EnhancedGrayscale)
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionAttempt {
    pub rotation: Rotation,
    pub variant: VariantKind,
    pub text: String,
    pub score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionStrategy {
    /// "Name :" label followed by free text
    LabelPattern,
    /// Line holding a name label and a separator, possibly continued on the next line
    LabeledLine,
    /// Run of uppercase words on an unlabeled line
    UppercaseRun,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameCandidate {
    pub value: String,
    pub strategy: ExtractionStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanFailure {
    UnusableInput,
    NoCardDetected,
    NameUnreadable,
    RecognitionFailed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub is_valid: bool,
    pub name: Option<String>,
    pub identifier: Option<String>,
    /// Heuristic card plausibility mapped into [0, 1]
    pub confidence: f32,
    pub error: Option<String>,
    pub failure: Option<ScanFailure>,
    pub institution: Option<String>,
    pub name_candidates: Vec<NameCandidate>,
    pub rotation: Option<Rotation>,
    pub variant: Option<VariantKind>,
    pub score: u32,
    pub attempts: usize,
}

impl ScanResult {
    pub fn failed(failure: ScanFailure, error: String) -> Self {
        ScanResult {
            is_valid: false,
            name: None,
            identifier: None,
            confidence: 0.0,
            error: Some(error),
            failure: Some(failure),
            institution: None,
            name_candidates: Vec::new(),
            rotation: None,
            variant: None,
            score: 0,
            attempts: 0,
        }
    }

    /// A valid scan whose name is long enough to be worth verifying.
    pub fn is_usable(&self) -> bool {
        self.is_valid && self.name.as_ref().map_or(false, |name| name.chars().count() >= 3)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub is_match: bool,
    pub similarity: f32,
    /// Candidate name the similarity refers to, when compared against a scan
    pub candidate: Option<String>,
}

impl MatchResult {
    pub fn no_match() -> Self {
        MatchResult {
            is_match: false,
            similarity: 0.0,
            candidate: None,
        }
    }
}

/// Outcome handed to the profile store after a verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub verified: bool,
    pub name: Option<String>,
    pub identifier: Option<String>,
    pub masked_identifier: Option<String>,
    pub institution: Option<String>,
    pub similarity: f32,
}

impl VerificationRecord {
    pub fn new(scan: &ScanResult, outcome: &MatchResult) -> Self {
        VerificationRecord {
            verified: scan.is_usable() && outcome.is_match,
            name: outcome.candidate.clone().or_else(|| scan.name.clone()),
            identifier: scan.identifier.clone(),
            masked_identifier: scan.identifier.as_deref().map(mask_identifier),
            institution: scan.institution.clone(),
            similarity: outcome.similarity,
        }
    }
}

/// Hide all but the last four characters of an identifier.
pub fn mask_identifier(identifier: &str) -> String {
    let chars: Vec<char> = identifier.chars().collect();
    if chars.len() <= 4 {
        return identifier.to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}
