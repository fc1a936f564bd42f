use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::pipeline::extraction::OcrConfig;

/// Application-level constants
pub const APP_NAME: &str = "labscan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_OCR_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    format!("{}=info,tower_http=info", env!("CARGO_CRATE_NAME"))
}

/// Runtime settings for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub ocr: OcrConfig,
    /// `tesseract` executable for the command-line engine. `None` uses PATH.
    pub tesseract_binary: Option<PathBuf>,
    pub ocr_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            ocr: OcrConfig::default(),
            tesseract_binary: None,
            ocr_timeout: Duration::from_secs(DEFAULT_OCR_TIMEOUT_SECS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    /// Read settings from `LABSCAN_*` environment variables.
    /// `LABSCAN_TESSERACT_BIN` only applies to the command-line engine.
    ///
    /// Unset variables keep their defaults. Set but unparsable ones are
    /// logged and ignored. The tessdata directory falls back to
    /// `TESSDATA_PREFIX` when `LABSCAN_TESSDATA_DIR` is absent.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = parse_var(&lookup, "LABSCAN_HOST") {
            config.host = host;
        }
        if let Some(port) = parse_var(&lookup, "LABSCAN_PORT") {
            config.port = port;
        }
        if let Some(lang) = lookup("LABSCAN_OCR_LANG").filter(|v| !v.trim().is_empty()) {
            config.ocr.lang = lang.trim().to_string();
        }
        config.ocr.tessdata_dir = lookup("LABSCAN_TESSDATA_DIR")
            .or_else(|| lookup("TESSDATA_PREFIX"))
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        config.tesseract_binary = lookup("LABSCAN_TESSERACT_BIN")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        match parse_var::<u64, _>(&lookup, "LABSCAN_OCR_TIMEOUT_SECS") {
            Some(0) => tracing::warn!("LABSCAN_OCR_TIMEOUT_SECS must be positive, using default"),
            Some(secs) => config.ocr_timeout = Duration::from_secs(secs),
            None => {}
        }
        match parse_var::<usize, _>(&lookup, "LABSCAN_MAX_UPLOAD_BYTES") {
            Some(0) => tracing::warn!("LABSCAN_MAX_UPLOAD_BYTES must be positive, using default"),
            Some(bytes) => config.max_upload_bytes = bytes,
            None => {}
        }

        config
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid configuration value, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_env() {
        let config = config_from(&[]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.ocr.lang, "eng");
        assert_eq!(config.ocr.page_seg_mode, 6);
        assert!(config.ocr.tessdata_dir.is_none());
        assert!(config.tesseract_binary.is_none());
        assert_eq!(config.ocr_timeout, Duration::from_secs(DEFAULT_OCR_TIMEOUT_SECS));
    }

    #[test]
    fn reads_all_variables() {
        let config = config_from(&[
            ("LABSCAN_HOST", "127.0.0.1"),
            ("LABSCAN_PORT", "9100"),
            ("LABSCAN_OCR_LANG", "eng+hin"),
            ("LABSCAN_TESSDATA_DIR", "/opt/tessdata"),
            ("LABSCAN_OCR_TIMEOUT_SECS", "15"),
            ("LABSCAN_MAX_UPLOAD_BYTES", "1048576"),
            ("LABSCAN_TESSERACT_BIN", "/opt/tesseract/bin/tesseract"),
        ]);
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:9100");
        assert_eq!(config.ocr.lang, "eng+hin");
        assert_eq!(config.ocr.tessdata_dir, Some(PathBuf::from("/opt/tessdata")));
        assert_eq!(config.ocr_timeout, Duration::from_secs(15));
        assert_eq!(config.max_upload_bytes, 1_048_576);
        assert_eq!(
            config.tesseract_binary,
            Some(PathBuf::from("/opt/tesseract/bin/tesseract"))
        );
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = config_from(&[
            ("LABSCAN_HOST", "not-an-ip"),
            ("LABSCAN_PORT", "99999"),
            ("LABSCAN_OCR_TIMEOUT_SECS", "0"),
            ("LABSCAN_MAX_UPLOAD_BYTES", "lots"),
            ("LABSCAN_OCR_LANG", "  "),
        ]);
        let defaults = ServerConfig::default();
        assert_eq!(config.host, defaults.host);
        assert_eq!(config.port, defaults.port);
        assert_eq!(config.ocr_timeout, defaults.ocr_timeout);
        assert_eq!(config.max_upload_bytes, defaults.max_upload_bytes);
        assert_eq!(config.ocr.lang, "eng");
    }

    #[test]
    fn tessdata_prefix_is_fallback() {
        let config = config_from(&[("TESSDATA_PREFIX", "/usr/share/tessdata")]);
        assert_eq!(config.ocr.tessdata_dir, Some(PathBuf::from("/usr/share/tessdata")));

        let config = config_from(&[
            ("TESSDATA_PREFIX", "/usr/share/tessdata"),
            ("LABSCAN_TESSDATA_DIR", "/srv/tessdata"),
        ]);
        assert_eq!(config.ocr.tessdata_dir, Some(PathBuf::from("/srv/tessdata")));
    }

    #[test]
    fn default_filter_names_this_crate() {
        assert!(default_log_filter().starts_with("labscan_lib=info"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
        assert_eq!(APP_NAME, "labscan");
    }
}
