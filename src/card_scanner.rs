use crate::models::{MatchResult, ScanFailure, ScanResult};
use crate::processing::{
    prepare_base, CancelToken, FieldExtractor, ImageProcessor, RecognitionOrchestrator, Recognizer,
    TesseractRecognizer, INSTITUTION_NAME,
};
use crate::utils::{ScanConfig, ScanError};
use crate::verification::{best_match, match_names};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, RgbImage};
use log::{debug, info, warn};

/// Entry point for scanning ID card photos and checking them against a profile.
///
/// The scanner holds no per-scan state, so one instance can serve concurrent
/// scans as long as the recognizer can.
pub struct CardScanner<R: Recognizer = TesseractRecognizer> {
    config: ScanConfig,
    recognizer: R,
}

impl CardScanner<TesseractRecognizer> {
    pub fn with_tesseract(config: ScanConfig) -> Self {
        let recognizer = TesseractRecognizer::new(config.recognizer.clone());
        CardScanner { config, recognizer }
    }
}

impl<R: Recognizer> CardScanner<R> {
    pub fn new(config: ScanConfig, recognizer: R) -> Self {
        CardScanner { config, recognizer }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan raw encoded image bytes (PNG, JPEG, ...).
    pub fn scan_card(&self, image_bytes: &[u8]) -> ScanResult {
        self.scan_card_with_cancel(image_bytes, &CancelToken::new())
    }

    pub fn scan_card_with_cancel(&self, image_bytes: &[u8], cancel: &CancelToken) -> ScanResult {
        let outcome =
            ImageProcessor::decode(image_bytes).and_then(|rgb| self.try_scan(rgb, cancel));
        Self::finish(outcome)
    }

    /// Scan an already decoded image.
    pub fn scan_image(&self, image: DynamicImage) -> ScanResult {
        let outcome = ImageProcessor::from_dynamic(image)
            .and_then(|rgb| self.try_scan(rgb, &CancelToken::new()));
        Self::finish(outcome)
    }

    /// Scan a base64 payload, with or without a `data:image/...;base64,` prefix.
    pub fn scan_card_base64(&self, data: &str) -> ScanResult {
        match decode_base64_image(data) {
            Ok(bytes) => self.scan_card(&bytes),
            Err(e) => Self::finish(Err(e)),
        }
    }

    /// Compare a profile name against the names read off a scanned card.
    pub fn verify_name(&self, profile_name: &str, scan: &ScanResult) -> MatchResult {
        if !scan.name_candidates.is_empty() {
            return best_match(profile_name, &scan.name_candidates);
        }
        match &scan.name {
            Some(name) => {
                let mut result = match_names(profile_name, name);
                result.candidate = Some(name.clone());
                result
            }
            None => MatchResult::no_match(),
        }
    }

    fn try_scan(&self, rgb: RgbImage, cancel: &CancelToken) -> Result<ScanResult, ScanError> {
        let (width, height) = rgb.dimensions();
        info!("Scanning card image {}x{}", width, height);

        let base = prepare_base(rgb, &self.config.preprocessing);
        let thresholds = self.config.search;
        let outcome =
            RecognitionOrchestrator::new(&self.recognizer, &self.config.preprocessing, thresholds)
                .run(&base, cancel)?;

        let best = &outcome.best;
        info!(
            "Best recognition at {} / {}: score={} after {} attempts",
            best.rotation, best.variant, best.score, outcome.attempts
        );
        debug!("Best recognized text:\n{}", best.text);

        if !outcome.is_viable(&thresholds) {
            let error = ScanError::NoCardDetected {
                best_score: best.score,
            };
            warn!("{}", error);
            return Ok(ScanResult {
                rotation: Some(best.rotation),
                variant: Some(best.variant),
                score: best.score,
                attempts: outcome.attempts,
                ..ScanResult::failed(ScanFailure::NoCardDetected, error.user_message())
            });
        }

        let name_candidates = FieldExtractor::extract_name_candidates(&best.text);
        let identifier = FieldExtractor::extract_identifier(&best.text);
        let institution = if FieldExtractor::is_institution_card(&best.text) {
            Some(INSTITUTION_NAME.to_string())
        } else {
            None
        };
        debug!("Name candidates: {:?}", name_candidates);

        let name = name_candidates.first().map(|c| c.value.clone());
        let (error, failure) = match name {
            Some(_) => (None, None),
            None => {
                warn!("{}", ScanError::NameUnreadable);
                (
                    Some(ScanError::NameUnreadable.user_message()),
                    Some(ScanFailure::NameUnreadable),
                )
            }
        };

        Ok(ScanResult {
            is_valid: name.is_some(),
            name,
            identifier,
            confidence: self.confidence(best.score),
            error,
            failure,
            institution,
            name_candidates,
            rotation: Some(best.rotation),
            variant: Some(best.variant),
            score: best.score,
            attempts: outcome.attempts,
        })
    }

    /// Score mapped into [0, 1]. A scale that is not a positive number yields 0.
    fn confidence(&self, score: u32) -> f32 {
        let scale = self.config.confidence_scale;
        if scale > 0.0 && scale.is_finite() {
            (score as f32 / scale).min(1.0)
        } else {
            0.0
        }
    }

    fn finish(outcome: Result<ScanResult, ScanError>) -> ScanResult {
        match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!("Scan failed: {}", e);
                ScanResult::failed(failure_kind(&e), e.user_message())
            }
        }
    }
}

fn failure_kind(error: &ScanError) -> ScanFailure {
    match error {
        ScanError::UnusableImage(_) => ScanFailure::UnusableInput,
        ScanError::NoCardDetected { .. } => ScanFailure::NoCardDetected,
        ScanError::NameUnreadable => ScanFailure::NameUnreadable,
        ScanError::Cancelled => ScanFailure::Cancelled,
        ScanError::Recognition(_) | ScanError::Config(_) | ScanError::Io(_) => {
            ScanFailure::RecognitionFailed
        }
    }
}

/// Decode a base64 image payload, stripping a data URL header if present.
pub fn decode_base64_image(data: &str) -> Result<Vec<u8>, ScanError> {
    let payload = match data.split_once(',') {
        Some((header, body)) if header.starts_with("data:") => body,
        _ => data,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| ScanError::UnusableImage(format!("Invalid base64 image data: {}", e)))
}
