pub mod api;
pub mod config;
pub mod models;
pub mod pipeline;

pub use models::LabTest;
pub use pipeline::extraction::{
    extract_text, normalize_image, ExtractionError, LabReportExtractor, NormalizedImage,
    OcrConfig, OcrEngine,
};
pub use pipeline::labs::{
    evaluate_range, is_out_of_range, parse_report, split_value_unit, RangeVerdict,
};

use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Pick the OCR engine for this build.
///
/// With the `ocr` feature the linked Tesseract library is used; otherwise the
/// `tesseract` executable is invoked per request.
fn build_ocr_engine(config: &ServerConfig) -> Result<Box<dyn OcrEngine>, ExtractionError> {
    #[cfg(feature = "ocr")]
    {
        let engine = pipeline::extraction::ocr::BundledTesseract::new(config.ocr.clone())?;
        tracing::info!(lang = %config.ocr.lang, "Using bundled Tesseract engine");
        Ok(Box::new(engine))
    }

    #[cfg(not(feature = "ocr"))]
    {
        let mut engine = pipeline::extraction::ocr::TesseractCli::new(config.ocr.clone());
        if let Some(ref binary) = config.tesseract_binary {
            engine = engine.with_binary(binary);
        }
        tracing::info!(
            lang = %config.ocr.lang,
            binary = ?config.tesseract_binary,
            "Using Tesseract command-line engine"
        );
        Ok(Box::new(engine))
    }
}

/// Entry point for the `labscan-server` binary.
pub fn run() -> Result<(), BoxError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let server_config = ServerConfig::from_env();
    let engine = build_ocr_engine(&server_config)?;
    let extractor = LabReportExtractor::with_engine(engine);
    let addr = server_config.bind_addr();
    let ctx = api::ApiContext::new(extractor, server_config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let mut server = api::start_server_on(ctx, addr).await?;
        tracing::info!(addr = %server.addr, "Listening");

        api::shutdown_signal().await;
        server.shutdown();
        server.stopped().await;
        Ok::<(), BoxError>(())
    })
}
