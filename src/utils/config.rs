use crate::utils::ScanError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const MAX_LONG_SIDE_LIMIT: u32 = 10_000;

/// Window size and offset for one adaptive threshold pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveParams {
    pub block_size: u32,
    pub c: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Short side the base image is upscaled to before binarization.
    pub target_min_dim: u32,
    /// Upper bound on the long side after upscaling.
    pub max_long_side: u32,
    pub large_block: AdaptiveParams,
    pub small_block: AdaptiveParams,
    /// Fraction of dark pixels above which a binarized buffer gets inverted.
    pub dark_ratio: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        PreprocessConfig {
            target_min_dim: 1400,
            max_long_side: 6000,
            large_block: AdaptiveParams { block_size: 31, c: 12 },
            small_block: AdaptiveParams { block_size: 15, c: 8 },
            dark_ratio: 0.6,
        }
    }
}

/// Score thresholds driving the rotation x variant search.
/// These were tuned against one card layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchThresholds {
    pub strong_score: u32,
    pub good_score: u32,
    pub min_viable_score: u32,
}

impl Default for SearchThresholds {
    fn default() -> Self {
        SearchThresholds {
            strong_score: 100,
            good_score: 70,
            min_viable_score: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    pub language: String,
    pub tessdata_dir: Option<String>,
    pub char_whitelist: String,
    /// Tesseract page segmentation mode, 6 = single uniform block of text
    pub page_seg_mode: String,
    pub preserve_interword_spaces: bool,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        RecognizerConfig {
            language: "eng".to_string(),
            tessdata_dir: None,
            char_whitelist:
                "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789.:() -/,\n"
                    .to_string(),
            page_seg_mode: "6".to_string(),
            preserve_interword_spaces: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub preprocessing: PreprocessConfig,
    pub search: SearchThresholds,
    pub recognizer: RecognizerConfig,
    /// Heuristic score that maps to a confidence of 1.0
    pub confidence_scale: f32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            preprocessing: PreprocessConfig::default(),
            search: SearchThresholds::default(),
            recognizer: RecognizerConfig::default(),
            confidence_scale: 120.0,
        }
    }
}

impl ScanConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScanError> {
        let raw = fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ScanError> {
        let config: ScanConfig =
            serde_json::from_str(raw).map_err(|e| ScanError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        let pre = &self.preprocessing;
        if pre.target_min_dim == 0 {
            return Err(ScanError::Config("target_min_dim must be positive".to_string()));
        }
        if pre.max_long_side > MAX_LONG_SIDE_LIMIT {
            return Err(ScanError::Config(format!(
                "max_long_side must not exceed {}, got {}",
                MAX_LONG_SIDE_LIMIT, pre.max_long_side
            )));
        }
        if pre.target_min_dim > pre.max_long_side {
            return Err(ScanError::Config(format!(
                "target_min_dim {} exceeds max_long_side {}",
                pre.target_min_dim, pre.max_long_side
            )));
        }
        for params in [pre.large_block, pre.small_block] {
            if params.block_size == 0 {
                return Err(ScanError::Config("block_size must be positive".to_string()));
            }
        }
        if !(0.0..=1.0).contains(&pre.dark_ratio) {
            return Err(ScanError::Config(format!(
                "dark_ratio must lie in [0, 1], got {}",
                pre.dark_ratio
            )));
        }
        if !(self.confidence_scale > 0.0 && self.confidence_scale.is_finite()) {
            return Err(ScanError::Config("confidence_scale must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_tuned_constants() {
        let config = ScanConfig::default();
        assert_eq!(config.search.strong_score, 100);
        assert_eq!(config.search.good_score, 70);
        assert_eq!(config.search.min_viable_score, 5);
        assert_eq!(config.preprocessing.target_min_dim, 1400);
        assert_eq!(config.recognizer.page_seg_mode, "6");
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config = ScanConfig::from_json(r#"{"search": {"good_score": 60}}"#).unwrap();
        assert_eq!(config.search.good_score, 60);
        assert_eq!(config.search.strong_score, 100);
        assert_eq!(config.preprocessing, PreprocessConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = ScanConfig::from_json(r#"{"preprocessing": {"dark_ratio": 1.5}}"#).unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
        assert!(ScanConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_upscale_bounds_rejected() {
        let too_large = r#"{"preprocessing": {"target_min_dim": 50000, "max_long_side": 50000}}"#;
        assert!(matches!(ScanConfig::from_json(too_large), Err(ScanError::Config(_))));

        let inverted = r#"{"preprocessing": {"target_min_dim": 2000, "max_long_side": 1500}}"#;
        assert!(matches!(ScanConfig::from_json(inverted), Err(ScanError::Config(_))));
    }

    #[test]
    fn test_non_positive_confidence_scale_rejected() {
        let mut config = ScanConfig::default();
        config.confidence_scale = 0.0;
        assert!(config.validate().is_err());
        config.confidence_scale = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"confidence_scale": 100.0, "recognizer": {{"language": "eng+hin"}}}}"#)
            .unwrap();
        let config = ScanConfig::from_file(file.path()).unwrap();
        assert_eq!(config.confidence_scale, 100.0);
        assert_eq!(config.recognizer.language, "eng+hin");
        assert!(config.recognizer.preserve_interword_spaces);
    }
}
