use super::ocr::extract_text;
use super::preprocess::{ImagePreprocessor, NormalizationPipeline};
use super::types::OcrEngine;
use super::ExtractionError;
use crate::models::LabTest;
use crate::pipeline::labs::parse_report;

/// Full image-to-records pipeline: normalize, OCR, parse.
///
/// Holds no per-request state, so a single instance can serve concurrent
/// requests behind an `Arc`.
pub struct LabReportExtractor {
    preprocessor: Box<dyn ImagePreprocessor>,
    ocr_engine: Box<dyn OcrEngine>,
}

impl LabReportExtractor {
    pub fn new(
        preprocessor: Box<dyn ImagePreprocessor>,
        ocr_engine: Box<dyn OcrEngine>,
    ) -> Self {
        Self {
            preprocessor,
            ocr_engine,
        }
    }

    /// Production normalization chain in front of the given engine.
    pub fn with_engine(ocr_engine: Box<dyn OcrEngine>) -> Self {
        Self::new(Box::new(NormalizationPipeline::standard()), ocr_engine)
    }

    /// OCR the report image and return the text, before parsing.
    pub fn extract_report_text(&self, image_bytes: &[u8]) -> Result<String, ExtractionError> {
        let normalized = self.preprocessor.preprocess(image_bytes)?;
        extract_text(&*self.ocr_engine, &normalized)
    }

    /// Extract lab-test records from a report image.
    ///
    /// Fails only on an unreadable image or an OCR engine error. Text that
    /// yields no records is a successful, empty result.
    pub fn extract(&self, image_bytes: &[u8]) -> Result<Vec<LabTest>, ExtractionError> {
        tracing::info!(bytes = image_bytes.len(), "Starting lab report extraction");

        let text = self.extract_report_text(image_bytes)?;
        let tests = parse_report(&text);

        tracing::info!(records = tests.len(), "Lab report extraction complete");
        Ok(tests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::ocr::MockOcrEngine;
    use crate::pipeline::extraction::preprocess::MockImagePreprocessor;

    fn extractor(text: &str) -> LabReportExtractor {
        LabReportExtractor::new(
            Box::new(MockImagePreprocessor::new()),
            Box::new(MockOcrEngine::new(text)),
        )
    }

    #[test]
    fn extracts_records_from_ocr_text() {
        let tests = extractor("Hemoglobin: 13.5 g/dL\n12.0 - 15.5\n")
            .extract(b"image")
            .unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].test_name, "Hemoglobin");
        assert_eq!(tests[0].lab_test_out_of_range, Some(false));
    }

    #[test]
    fn report_without_results_is_empty_success() {
        let tests = extractor("CITY LABORATORY\nThank you").extract(b"image").unwrap();
        assert!(tests.is_empty());
    }

    #[test]
    fn image_failure_aborts_before_ocr() {
        let extractor = LabReportExtractor::new(
            Box::new(MockImagePreprocessor::failing()),
            Box::new(MockOcrEngine::failing("must not be called")),
        );
        let result = extractor.extract(b"image");
        assert!(matches!(result, Err(ExtractionError::ImageRead(_))));
    }

    #[test]
    fn ocr_failure_is_terminal() {
        let extractor = LabReportExtractor::new(
            Box::new(MockImagePreprocessor::new()),
            Box::new(MockOcrEngine::failing("tesseract crashed")),
        );
        let err = extractor.extract(b"image").unwrap_err();
        assert!(err.is_ocr_failure());
    }

    #[test]
    fn report_text_is_trimmed() {
        let text = extractor("\n  TSH: 2.1 mIU/L  \n")
            .extract_report_text(b"image")
            .unwrap();
        assert_eq!(text, "TSH: 2.1 mIU/L");
    }

    #[test]
    fn real_normalizer_feeds_engine() {
        use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};

        let page = RgbImage::from_fn(32, 24, |x, y| {
            let v = if (y / 3) % 2 == 0 { 220 } else { 30 } + ((x + y) % 5) as u8;
            Rgb([v, v, v])
        });
        let mut cursor = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(page)
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .unwrap();

        let extractor = LabReportExtractor::with_engine(Box::new(MockOcrEngine::new(
            "Creatinine: 1.4 mg/dL\n0.6 - 1.2",
        )));
        let tests = extractor.extract(&cursor.into_inner()).unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].lab_test_out_of_range, Some(true));
    }
}
