pub mod extractors;
pub mod image;
pub mod ocr;
pub mod orchestrator;
pub mod text_correction;
pub mod variants;

pub use extractors::{FieldExtractor, INSTITUTION_NAME};
pub use self::image::ImageProcessor;
pub use ocr::{Recognizer, TesseractRecognizer};
pub use orchestrator::{
    score_text, CancelToken, RecognitionOrchestrator, SearchControl, SearchOutcome, SearchState,
};
pub use variants::{generate_variants, prepare_base, PreprocessingVariant};
