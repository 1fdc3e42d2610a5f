use crate::utils::{RecognizerConfig, ScanError};
use image::{GrayImage, ImageFormat};
use log::debug;
use tesseract::Tesseract;

/// Turns a preprocessed card image into raw text.
///
/// Implementations must not carry mutable state between calls: the scanner
/// invokes them once per (rotation, variant) attempt and may share one instance
/// between concurrent scans.
pub trait Recognizer: Send + Sync {
    fn recognize(&self, image: &GrayImage) -> Result<String, ScanError>;
}

/// Recognizer backed by a fresh Tesseract instance per call.
pub struct TesseractRecognizer {
    config: RecognizerConfig,
}

impl TesseractRecognizer {
    pub fn new(config: RecognizerConfig) -> Self {
        TesseractRecognizer { config }
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    fn variables(&self) -> Vec<(&'static str, String)> {
        vec![
            ("tessedit_char_whitelist", self.config.char_whitelist.clone()),
            ("tessedit_pageseg_mode", self.config.page_seg_mode.clone()),
            (
                "preserve_interword_spaces",
                if self.config.preserve_interword_spaces { "1" } else { "0" }.to_string(),
            ),
        ]
    }
}

impl Recognizer for TesseractRecognizer {
    fn recognize(&self, image: &GrayImage) -> Result<String, ScanError> {
        // PNG keeps the binarized edges lossless
        let temp_file = tempfile::Builder::new().suffix(".png").tempfile()?;
        image
            .save_with_format(temp_file.path(), ImageFormat::Png)
            .map_err(|e| ScanError::Recognition(format!("Failed to write temp image: {}", e)))?;

        let image_path = temp_file
            .path()
            .to_str()
            .ok_or_else(|| ScanError::Recognition("Failed to convert path to string".to_string()))?;

        let mut tess = Tesseract::new(
            self.config.tessdata_dir.as_deref(),
            Some(self.config.language.as_str()),
        )
        .map_err(|e| ScanError::Recognition(format!("Tesseract init error: {}", e)))?;

        for (name, value) in self.variables() {
            tess = tess.set_variable(name, &value).map_err(|e| {
                ScanError::Recognition(format!("Tesseract set variable {} error: {}", name, e))
            })?;
        }

        let text = tess
            .set_image(image_path)
            .map_err(|e| ScanError::Recognition(format!("Tesseract set image error: {}", e)))?
            .get_text()
            .map_err(|e| ScanError::Recognition(format!("Tesseract error: {}", e)))?;

        debug!(
            "Recognized {} characters from {}x{} image",
            text.len(),
            image.width(),
            image.height()
        );
        Ok(text)
    }
}
