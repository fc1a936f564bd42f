use image::GrayImage;

use super::ExtractionError;

/// Page segmentation mode 6: assume a single uniform block of text.
pub const PSM_SINGLE_BLOCK: u32 = 6;

/// OCR engine mode 3: whatever the engine considers its best available mode.
pub const OEM_DEFAULT: u32 = 3;

/// Output of the image normalizer: a two-level grayscale image ready for OCR.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// Binarized image, every pixel is either 0 or 255.
    pub image: GrayImage,
    /// Otsu threshold chosen during binarization.
    pub threshold: u8,
}

impl NormalizedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Raw OCR result from the engine
#[derive(Debug)]
pub struct OcrPageResult {
    pub text: String,
}

/// How the OCR engine should read the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrConfig {
    /// Tesseract language code(s), e.g. "eng" or "eng+fra".
    pub lang: String,
    pub page_seg_mode: u32,
    pub engine_mode: u32,
    /// Custom tessdata directory. `None` uses the engine's default lookup.
    pub tessdata_dir: Option<std::path::PathBuf>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            lang: "eng".to_string(),
            page_seg_mode: PSM_SINGLE_BLOCK,
            engine_mode: OEM_DEFAULT,
            tessdata_dir: None,
        }
    }
}

/// OCR engine abstraction (allows mocking for tests)
pub trait OcrEngine: Send + Sync {
    /// Recognize text in an encoded image (PNG, JPEG, ...).
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError>;
}
