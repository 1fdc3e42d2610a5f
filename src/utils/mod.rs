pub mod config;
pub mod error;

pub use config::{AdaptiveParams, PreprocessConfig, RecognizerConfig, ScanConfig, SearchThresholds};
pub use error::ScanError;
