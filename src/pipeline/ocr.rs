//! Tesseract OCR over preprocessed page images.
//!
//! The engine is a trait so the scanned-document logic in
//! [`crate::pipeline::extract`] can run against a fake in tests. The
//! production [`TesseractOcr`] shells out to the `tesseract` binary once per
//! page; page images live in a [`tempfile::TempDir`] that is removed when
//! the call returns, on success and on every error path.

use crate::config::StatementConfig;
use crate::error::{Dependency, ExtractError};
use image::DynamicImage;
use std::io;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// Something that turns page images into text. Blocking; callers run it in
/// `spawn_blocking`.
pub trait OcrEngine: Send + Sync {
    /// Recognise every page and return the page texts joined in order.
    fn recognize(&self, pages: &[DynamicImage]) -> Result<String, ExtractError>;
}

/// [`OcrEngine`] backed by the `tesseract` CLI.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: String,
    psm: u8,
    language: String,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<String>, psm: u8, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            psm,
            language: language.into(),
        }
    }

    pub fn from_config(config: &StatementConfig) -> Self {
        Self::new(
            config.tesseract_path.clone(),
            config.tesseract_psm,
            config.ocr_language.clone(),
        )
    }

    /// True when the binary can be spawned and reports a version.
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn run_page(&self, path: &Path) -> Result<String, ExtractError> {
        let output = Command::new(&self.binary)
            .arg(path.as_os_str())
            .arg("stdout")
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => ExtractError::DependencyMissing(
                    Dependency::Tesseract,
                    format!("could not run '{}': {}", self.binary, e),
                ),
                _ => ExtractError::failed("ocr", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::failed(
                "ocr",
                format!(
                    "tesseract exited with code {}: {}",
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                ),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, pages: &[DynamicImage]) -> Result<String, ExtractError> {
        let dir = tempfile::tempdir().map_err(|e| ExtractError::failed("ocr", e))?;

        let mut texts = Vec::with_capacity(pages.len());
        for (idx, page) in pages.iter().enumerate() {
            let path = dir.path().join(format!("page_{:04}.png", idx + 1));
            page.save(&path)
                .map_err(|e| ExtractError::failed("ocr", format!("page {}: {}", idx + 1, e)))?;

            match self.run_page(&path) {
                Ok(text) => {
                    debug!("OCR page {}: {} chars", idx + 1, text.len());
                    texts.push(text);
                }
                // No point trying the remaining pages.
                Err(e @ ExtractError::DependencyMissing(..)) => return Err(e),
                Err(e) => warn!("OCR page {} skipped: {}", idx + 1, e),
            }
        }

        Ok(texts.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_dependency_missing() {
        let ocr = TesseractOcr::new("/nonexistent/tesseract-binary", 3, "eng");
        assert!(!ocr.is_available());

        let page = DynamicImage::new_luma8(8, 8);
        let err = ocr.recognize(&[page]).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::DependencyMissing(Dependency::Tesseract, _)
        ));
    }

    #[test]
    fn no_pages_is_empty_text() {
        let ocr = TesseractOcr::new("/nonexistent/tesseract-binary", 3, "eng");
        assert_eq!(ocr.recognize(&[]).unwrap(), "");
    }

    #[test]
    fn from_config_uses_configured_binary() {
        let config = StatementConfig::builder()
            .tesseract_path("/opt/tess/bin/tesseract")
            .ocr_language("deu")
            .build()
            .unwrap();
        let ocr = TesseractOcr::from_config(&config);
        assert_eq!(ocr.binary, "/opt/tess/bin/tesseract");
        assert_eq!(ocr.language, "deu");
        assert_eq!(ocr.psm, 3);
    }
}
