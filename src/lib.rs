pub mod card_scanner;
pub mod models;
pub mod processing;
pub mod utils;
pub mod verification;

pub use card_scanner::CardScanner;
pub use models::{MatchResult, ScanFailure, ScanResult, VerificationRecord};
pub use processing::{CancelToken, Recognizer, TesseractRecognizer};
pub use utils::{ScanConfig, ScanError};
