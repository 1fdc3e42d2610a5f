use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Unusable image: {0}")]
    UnusableImage(String),
    #[error("No ID card detected (best score {best_score})")]
    NoCardDetected { best_score: u32 },
    #[error("Card detected but no name could be read")]
    NameUnreadable,
    #[error("Recognition error: {0}")]
    Recognition(String),
    #[error("Scan cancelled")]
    Cancelled,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    /// Message shown to the person holding the card, not to the developer.
    pub fn user_message(&self) -> String {
        match self {
            ScanError::UnusableImage(_) => {
                "The photo could not be read. Please upload a clear image of your ID card.".to_string()
            }
            ScanError::NoCardDetected { .. } => {
                "Could not detect an ID card. Please ensure the entire card is visible in the photo."
                    .to_string()
            }
            ScanError::NameUnreadable => {
                "Could not read the name from your ID card. Please try again with better lighting and avoid glare on the card."
                    .to_string()
            }
            ScanError::Recognition(_) => "OCR failed. Please try again.".to_string(),
            ScanError::Cancelled => "Scan cancelled.".to_string(),
            ScanError::Config(msg) => format!("Configuration error: {}", msg),
            ScanError::Io(err) => format!("IO error: {}", err),
        }
    }
}
