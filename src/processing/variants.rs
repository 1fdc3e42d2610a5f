use crate::models::VariantKind;
use crate::processing::ImageProcessor;
use crate::utils::PreprocessConfig;
use image::{GrayImage, RgbImage};

/// One binarized (or enhanced grayscale) rendition of a base image.
#[derive(Debug, Clone)]
pub struct PreprocessingVariant {
    pub kind: VariantKind,
    pub image: GrayImage,
}

impl VariantKind {
    /// Run this recipe against a grayscale, rescaled base buffer.
    pub fn apply(&self, base: &GrayImage, config: &PreprocessConfig) -> GrayImage {
        match self {
            VariantKind::AdaptiveLargeBlock => ImageProcessor::correct_polarity(
                ImageProcessor::adaptive_threshold(base.clone(), config.large_block),
                config.dark_ratio,
            ),
            VariantKind::ContrastOtsu => {
                let stretched = ImageProcessor::contrast_stretch(base.clone());
                ImageProcessor::correct_polarity(
                    ImageProcessor::otsu_threshold(stretched),
                    config.dark_ratio,
                )
            }
            VariantKind::EnhancedGrayscale => ImageProcessor::contrast_stretch(base.clone()),
            VariantKind::AdaptiveSmallBlock => ImageProcessor::correct_polarity(
                ImageProcessor::adaptive_threshold(base.clone(), config.small_block),
                config.dark_ratio,
            ),
        }
    }
}

/// Grayscale and upscale a decoded photo into the base every variant starts from.
pub fn prepare_base(image: RgbImage, config: &PreprocessConfig) -> GrayImage {
    let gray = ImageProcessor::grayscale(image);
    ImageProcessor::rescale(gray, config.target_min_dim, config.max_long_side)
}

/// All four variants in priority order.
pub fn generate_variants(base: &GrayImage, config: &PreprocessConfig) -> Vec<PreprocessingVariant> {
    VariantKind::ALL
        .iter()
        .map(|kind| PreprocessingVariant {
            kind: *kind,
            image: kind.apply(base, config),
        })
        .collect()
}
