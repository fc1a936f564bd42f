use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::preprocess::encode_png;
use super::types::{NormalizedImage, OcrConfig, OcrEngine, OcrPageResult};
use super::ExtractionError;

/// Run OCR on a normalized image and return the recognized text, trimmed.
///
/// No retry: an engine failure is terminal for the report.
pub fn extract_text(
    engine: &dyn OcrEngine,
    image: &NormalizedImage,
) -> Result<String, ExtractionError> {
    let png = encode_png(&image.image)?;
    let result = engine.ocr_image(&png)?;
    let text = result.text.trim().to_string();

    tracing::debug!(
        chars = text.len(),
        lines = text.lines().count(),
        "OCR text extracted"
    );

    Ok(text)
}

/// Tesseract driven through its command-line executable.
///
/// Needs no native linkage at build time, only a `tesseract` binary on PATH
/// (or at a configured location) when a request arrives.
pub struct TesseractCli {
    binary: PathBuf,
    config: OcrConfig,
}

impl TesseractCli {
    pub fn new(config: OcrConfig) -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            config,
        }
    }

    /// Use a specific executable instead of the one on PATH.
    pub fn with_binary(mut self, binary: &Path) -> Self {
        self.binary = binary.to_path_buf();
        self
    }

    /// Arguments for reading `image_path` and writing plain text to stdout.
    fn build_args(&self, image_path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            image_path.as_os_str().to_os_string(),
            "stdout".into(),
            "-l".into(),
            self.config.lang.clone().into(),
            "--oem".into(),
            self.config.engine_mode.to_string().into(),
            "--psm".into(),
            self.config.page_seg_mode.to_string().into(),
        ];
        if let Some(ref dir) = self.config.tessdata_dir {
            args.push("--tessdata-dir".into());
            args.push(dir.as_os_str().to_os_string());
        }
        args
    }
}

impl OcrEngine for TesseractCli {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
        // Removed when `staged` drops, on every return path.
        let mut staged = tempfile::Builder::new()
            .prefix("labscan-")
            .suffix(".png")
            .tempfile()?;
        staged.write_all(image_bytes)?;
        staged.flush()?;

        let output = Command::new(&self.binary)
            .args(self.build_args(staged.path()))
            .output()
            .map_err(|e| {
                ExtractionError::OcrInit(format!(
                    "failed to run {} (is it installed?): {e}",
                    self.binary.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::OcrProcessing(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(OcrPageResult {
            text: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

/// Bundled Tesseract OCR engine.
/// Only available when compiled with the `ocr` feature flag.
#[cfg(feature = "ocr")]
pub struct BundledTesseract {
    config: OcrConfig,
}

#[cfg(feature = "ocr")]
impl BundledTesseract {
    /// Initialize with the given config. A configured tessdata directory must
    /// contain traineddata for the first requested language.
    pub fn new(config: OcrConfig) -> Result<Self, ExtractionError> {
        if let Some(ref dir) = config.tessdata_dir {
            let primary = config.lang.split('+').next().unwrap_or("eng");
            if !dir.join(format!("{primary}.traineddata")).exists() {
                return Err(ExtractionError::TessdataNotFound(dir.clone()));
            }
        }
        Ok(Self { config })
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for BundledTesseract {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
        let tessdata = match self.config.tessdata_dir {
            Some(ref dir) => Some(
                dir.to_str()
                    .ok_or_else(|| ExtractionError::OcrInit("Invalid tessdata path".into()))?,
            ),
            None => None,
        };

        let tess = tesseract::Tesseract::new_with_oem(
            tessdata,
            Some(self.config.lang.as_str()),
            engine_mode(self.config.engine_mode),
        )
        .map_err(|e| ExtractionError::OcrInit(format!("{e:?}")))?
        .set_variable(
            "tessedit_pageseg_mode",
            &self.config.page_seg_mode.to_string(),
        )
        .map_err(|e| ExtractionError::OcrConfig(format!("{e:?}")))?;

        let mut tess = tess
            .set_image_from_mem(image_bytes)
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let text = tess
            .get_text()
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        Ok(OcrPageResult { text })
    }
}

/// Map a numeric `--oem` value to the bindings' enum. Unknown values use the
/// engine default.
#[cfg(feature = "ocr")]
fn engine_mode(oem: u32) -> tesseract::OcrEngineMode {
    match oem {
        0 => tesseract::OcrEngineMode::TesseractOnly,
        1 => tesseract::OcrEngineMode::LstmOnly,
        2 => tesseract::OcrEngineMode::TesseractLstmCombined,
        _ => tesseract::OcrEngineMode::Default,
    }
}

/// Mock OCR engine for unit testing without Tesseract.
pub struct MockOcrEngine {
    pub text: String,
    failure: Option<String>,
}

impl MockOcrEngine {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            failure: None,
        }
    }

    /// An engine whose every call fails with `OcrProcessing(message)`.
    pub fn failing(message: &str) -> Self {
        Self {
            text: String::new(),
            failure: Some(message.to_string()),
        }
    }
}

impl OcrEngine for MockOcrEngine {
    fn ocr_image(&self, _image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
        if let Some(ref message) = self.failure {
            return Err(ExtractionError::OcrProcessing(message.clone()));
        }
        Ok(OcrPageResult {
            text: self.text.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn blank_page() -> NormalizedImage {
        NormalizedImage {
            image: GrayImage::from_pixel(16, 16, Luma([255])),
            threshold: 0,
        }
    }

    #[test]
    fn mock_ocr_returns_configured_text() {
        let engine = MockOcrEngine::new("Hemoglobin: 13.5 g/dL");
        let result = engine.ocr_image(b"fake_image_bytes").unwrap();
        assert_eq!(result.text, "Hemoglobin: 13.5 g/dL");
    }

    #[test]
    fn extract_text_trims_engine_output() {
        let engine = MockOcrEngine::new("\n\n  Glucose: 90 mg/dL\n70 - 110  \n\n");
        let text = extract_text(&engine, &blank_page()).unwrap();
        assert_eq!(text, "Glucose: 90 mg/dL\n70 - 110");
    }

    #[test]
    fn extract_text_propagates_engine_failure() {
        let engine = MockOcrEngine::failing("engine crashed");
        let result = extract_text(&engine, &blank_page());
        match result {
            Err(ExtractionError::OcrProcessing(msg)) => assert_eq!(msg, "engine crashed"),
            other => panic!("expected OcrProcessing, got {other:?}"),
        }
    }

    #[test]
    fn cli_args_use_single_block_defaults() {
        let engine = TesseractCli::new(OcrConfig::default());
        let args = engine.build_args(Path::new("/tmp/page.png"));
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec!["/tmp/page.png", "stdout", "-l", "eng", "--oem", "3", "--psm", "6"]
        );
    }

    #[test]
    fn cli_args_include_tessdata_dir() {
        let config = OcrConfig {
            lang: "eng+fra".into(),
            tessdata_dir: Some(PathBuf::from("/opt/tessdata")),
            ..OcrConfig::default()
        };
        let engine = TesseractCli::new(config);
        let args: Vec<String> = engine
            .build_args(Path::new("page.png"))
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args.contains(&"eng+fra".to_string()));
        let idx = args.iter().position(|a| a == "--tessdata-dir").unwrap();
        assert_eq!(args[idx + 1], "/opt/tessdata");
    }

    #[test]
    fn cli_missing_binary_is_init_error() {
        let engine = TesseractCli::new(OcrConfig::default())
            .with_binary(Path::new("/nonexistent/bin/tesseract"));
        let result = engine.ocr_image(b"not really a png");
        assert!(matches!(result, Err(ExtractionError::OcrInit(_))));
        assert!(result.unwrap_err().is_ocr_failure());
    }

    #[cfg(feature = "ocr")]
    #[test]
    fn bundled_tesseract_rejects_missing_tessdata() {
        let dir = tempfile::tempdir().unwrap();
        let config = OcrConfig {
            tessdata_dir: Some(dir.path().to_path_buf()),
            ..OcrConfig::default()
        };
        let result = BundledTesseract::new(config);
        assert!(matches!(result, Err(ExtractionError::TessdataNotFound(_))));
    }

    #[cfg(feature = "ocr")]
    #[test]
    fn bundled_engine_mode_follows_config() {
        assert!(matches!(engine_mode(1), tesseract::OcrEngineMode::LstmOnly));
        assert!(matches!(engine_mode(3), tesseract::OcrEngineMode::Default));
        assert!(matches!(engine_mode(42), tesseract::OcrEngineMode::Default));
    }
}
