use crate::models::{RecognitionAttempt, Rotation, VariantKind};
use crate::processing::ocr::Recognizer;
use crate::processing::ImageProcessor;
use crate::utils::{PreprocessConfig, ScanError, SearchThresholds};
use image::GrayImage;
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

lazy_static! {
    // Points awarded for each card-like feature present in recognized text
    static ref SCORE_RULES: Vec<(Regex, u32)> = vec![
        (Regex::new(r"(?i)name\s*[:;.]").unwrap(), 50),
        (Regex::new(r"(?i)programme").unwrap(), 20),
        (Regex::new(r"(?i)register").unwrap(), 20),
        (Regex::new(r"(?i)srm").unwrap(), 10),
        (Regex::new(r"(?i)faculty").unwrap(), 10),
        (Regex::new(r"(?i)engineering").unwrap(), 10),
        (Regex::new(r"(?i)b\.?\s*tech").unwrap(), 15),
        (Regex::new(r"(?i)ra\d{6,}").unwrap(), 25),
        (Regex::new(r"(?i)kattankulathur").unwrap(), 10),
        (Regex::new(r"(?i)valid").unwrap(), 5),
        (Regex::new(r"(?i)student").unwrap(), 5),
    ];
}

/// How card-like a piece of recognized text looks. Not a correctness measure.
pub fn score_text(text: &str) -> u32 {
    SCORE_RULES
        .iter()
        .filter(|(pattern, _)| pattern.is_match(text))
        .map(|(_, points)| points)
        .sum()
}

/// Shared flag a caller flips to abandon an in-flight scan.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// What the search should do after an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchControl {
    Continue,
    Stop,
}

/// Best-so-far bookkeeping for the rotation x variant search.
///
/// Only the single best attempt is retained; ties keep the earlier attempt.
#[derive(Debug, Clone)]
pub struct SearchState {
    thresholds: SearchThresholds,
    best: Option<RecognitionAttempt>,
    best_in_rotation: u32,
    attempts: usize,
}

impl SearchState {
    pub fn new(thresholds: SearchThresholds) -> Self {
        SearchState {
            thresholds,
            best: None,
            best_in_rotation: 0,
            attempts: 0,
        }
    }

    /// Record one attempt. Stops the whole search on a strong score.
    pub fn observe(&mut self, attempt: RecognitionAttempt) -> SearchControl {
        self.attempts += 1;
        self.best_in_rotation = self.best_in_rotation.max(attempt.score);
        let score = attempt.score;

        let improves = self.best.as_ref().map_or(true, |best| score > best.score);
        if improves {
            self.best = Some(attempt);
        }

        if score >= self.thresholds.strong_score {
            SearchControl::Stop
        } else {
            SearchControl::Continue
        }
    }

    /// Close out a rotation. A good score inside it ends the search.
    pub fn finish_rotation(&mut self) -> SearchControl {
        let rotation_best = std::mem::take(&mut self.best_in_rotation);
        if rotation_best >= self.thresholds.good_score {
            SearchControl::Stop
        } else {
            SearchControl::Continue
        }
    }

    pub fn best(&self) -> Option<&RecognitionAttempt> {
        self.best.as_ref()
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn into_outcome(self) -> Option<SearchOutcome> {
        let attempts = self.attempts;
        self.best.map(|best| SearchOutcome { best, attempts })
    }
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best: RecognitionAttempt,
    pub attempts: usize,
}

impl SearchOutcome {
    pub fn is_viable(&self, thresholds: &SearchThresholds) -> bool {
        self.best.score >= thresholds.min_viable_score
    }
}

/// Drives the recognizer across rotation hypotheses and preprocessing variants.
pub struct RecognitionOrchestrator<'a, R: Recognizer + ?Sized> {
    recognizer: &'a R,
    preprocessing: &'a PreprocessConfig,
    thresholds: SearchThresholds,
}

impl<'a, R: Recognizer + ?Sized> RecognitionOrchestrator<'a, R> {
    pub fn new(
        recognizer: &'a R,
        preprocessing: &'a PreprocessConfig,
        thresholds: SearchThresholds,
    ) -> Self {
        RecognitionOrchestrator {
            recognizer,
            preprocessing,
            thresholds,
        }
    }

    /// Search for the most card-like text. `base` is the grayscale, rescaled photo.
    pub fn run(&self, base: &GrayImage, cancel: &CancelToken) -> Result<SearchOutcome, ScanError> {
        let mut state = SearchState::new(self.thresholds);
        let mut last_error = None;

        'rotations: for rotation in Rotation::SEARCH_ORDER {
            debug!("Trying rotation {}", rotation);
            let rotated = ImageProcessor::rotate(base.clone(), rotation);

            for variant in VariantKind::ALL {
                if cancel.is_cancelled() {
                    info!("Scan cancelled after {} attempts", state.attempts());
                    return Err(ScanError::Cancelled);
                }

                let image = variant.apply(&rotated, self.preprocessing);
                let text = match self.recognizer.recognize(&image) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Recognition failed at {} / {}: {}", rotation, variant, e);
                        last_error = Some(e);
                        continue;
                    }
                };

                let score = score_text(&text);
                debug!("Variant {} at {}: score={}", variant, rotation, score);

                let control = state.observe(RecognitionAttempt {
                    rotation,
                    variant,
                    text,
                    score,
                });
                if control == SearchControl::Stop {
                    info!("Strong match at {} / {}, stopping early", rotation, variant);
                    break 'rotations;
                }
            }

            if state.finish_rotation() == SearchControl::Stop {
                info!("Good match at {}, skipping remaining rotations", rotation);
                break;
            }
        }

        match state.into_outcome() {
            Some(outcome) => Ok(outcome),
            None => Err(last_error.unwrap_or_else(|| {
                ScanError::Recognition("No recognition attempt completed".to_string())
            })),
        }
    }
}
