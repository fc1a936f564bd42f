pub mod types;
pub mod preprocess;
pub mod ocr;
pub mod orchestrator;

pub use types::*;
pub use preprocess::*;
pub use ocr::*;
pub use orchestrator::*;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not read image: {0}")]
    ImageRead(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Tesseract OCR initialization failed: {0}")]
    OcrInit(String),

    #[error("Tesseract OCR configuration error: {0}")]
    OcrConfig(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("Tessdata not found at: {0}")]
    TessdataNotFound(PathBuf),
}

impl ExtractionError {
    /// True when the failure came from the OCR engine rather than the image.
    pub fn is_ocr_failure(&self) -> bool {
        matches!(
            self,
            ExtractionError::OcrInit(_)
                | ExtractionError::OcrConfig(_)
                | ExtractionError::OcrProcessing(_)
                | ExtractionError::TessdataNotFound(_)
        )
    }
}
