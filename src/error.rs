//! Error types for the edgequake-statement library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`StatementError`] is **fatal**: the request cannot produce a job at all
//!   (bad upload, missing native dependency, no text recovered, model call
//!   failed). Returned from [`crate::process::StatementProcessor`] and the
//!   top-level stage functions.
//!
//! * [`ExtractError`] is **per sub-step**: one extraction method (pdfium text
//!   layer, secondary parser, OCR, vision) failed. The extractor decides
//!   whether a sibling method can still succeed or whether the failure must
//!   be surfaced, instead of swallowing everything behind a catch-all.
//!
//! Malformed model output is never an error: the agent recovers locally
//! (empty list, `Other` categories).

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Native dependency the extraction pipeline shells out to or binds against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    /// The pdfium shared library, used for the text layer and rasterisation.
    Pdfium,
    /// The `tesseract` OCR binary.
    Tesseract,
}

impl Dependency {
    /// User-actionable installation hint.
    pub fn install_hint(&self) -> &'static str {
        match self {
            Dependency::Pdfium => {
                "PDF to image failed: pdfium is required for scanned PDFs.\n\
Download a build from https://github.com/bblanchon/pdfium-binaries and set\n\
PDFIUM_LIB_PATH=/path/to/libpdfium (or place it next to the binary)."
            }
            Dependency::Tesseract => {
                "OCR failed: Tesseract is required for scanned PDFs.\n\
Install it (e.g. brew install tesseract on macOS, apt install tesseract-ocr on Linux)\n\
and ensure it is on PATH, or pass --tesseract-path."
            }
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Pdfium => f.write_str("pdfium"),
            Dependency::Tesseract => f.write_str("tesseract"),
        }
    }
}

/// All fatal errors returned by the edgequake-statement library.
#[derive(Debug, Error)]
pub enum StatementError {
    // ── Input validation ──────────────────────────────────────────────────
    /// Upload declared a content type other than `application/pdf`.
    #[error("File must be a PDF (got content type '{content_type}')")]
    UnsupportedContentType { content_type: String },

    /// Upload had zero bytes.
    #[error("Empty file")]
    EmptyFile,

    /// Upload exceeded the configured size ceiling.
    #[error("File too large: {size} bytes (limit {limit} bytes)")]
    FileTooLarge { size: usize, limit: usize },

    /// The bytes do not start with the `%PDF` magic.
    #[error("File is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { magic: [u8; 4] },

    // ── Extraction ────────────────────────────────────────────────────────
    /// A native library or binary needed for the chosen path is not installed.
    #[error("{dependency} is not available: {detail}\n{}", .dependency.install_hint())]
    DependencyMissing {
        dependency: Dependency,
        detail: String,
    },

    /// Any other parse or render failure.
    #[error("PDF parsing failed: {0}")]
    ExtractionFailed(String),

    /// Every extraction path ran but produced only whitespace.
    #[error(
        "Could not extract text from PDF (empty or image-only).\n\
For scanned PDFs, install pdfium and Tesseract or configure a vision provider."
    )]
    NoTextRecovered,

    // ── LLM ───────────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Network, auth or rate-limit failure from the language-model client.
    #[error("Failed to process statement with AI: {0}")]
    ModelCallFailed(String),

    // ── Lookup ────────────────────────────────────────────────────────────
    /// No job exists under the given identifier.
    #[error("Job not found: '{job_id}'")]
    JobNotFound { job_id: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output CSV file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config ────────────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (task panicked, runtime unavailable).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StatementError {
    /// True for the input-validation class of errors (never retried).
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            StatementError::UnsupportedContentType { .. }
                | StatementError::EmptyFile
                | StatementError::FileTooLarge { .. }
                | StatementError::NotAPdf { .. }
        )
    }
}

/// Outcome of a single failed extraction sub-step.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The sub-step needs a native dependency that is not installed.
    #[error("{0} is not available: {1}")]
    DependencyMissing(Dependency, String),

    /// The sub-step ran and failed for another reason.
    #[error("{method} failed: {detail}")]
    Failed {
        method: &'static str,
        detail: String,
    },
}

impl ExtractError {
    pub(crate) fn failed(method: &'static str, detail: impl fmt::Display) -> Self {
        ExtractError::Failed {
            method,
            detail: detail.to_string(),
        }
    }
}

impl From<ExtractError> for StatementError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::DependencyMissing(dependency, detail) => {
                StatementError::DependencyMissing { dependency, detail }
            }
            ExtractError::Failed { method, detail } => {
                StatementError::ExtractionFailed(format!("{method}: {detail}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_missing_carries_install_hint() {
        let e = StatementError::from(ExtractError::DependencyMissing(
            Dependency::Tesseract,
            "No such file or directory".into(),
        ));
        let msg = e.to_string();
        assert!(msg.contains("tesseract is not available"), "got: {msg}");
        assert!(msg.contains("apt install tesseract-ocr"), "got: {msg}");
    }

    #[test]
    fn generic_failure_is_not_dependency_missing() {
        let e = StatementError::from(ExtractError::failed("render", "bad xref"));
        assert!(matches!(e, StatementError::ExtractionFailed(_)));
        assert!(e.to_string().contains("render: bad xref"));
    }

    #[test]
    fn file_too_large_display() {
        let e = StatementError::FileTooLarge {
            size: 30,
            limit: 20,
        };
        assert!(e.to_string().contains("limit 20"));
        assert!(e.is_invalid_input());
    }

    #[test]
    fn job_not_found_display() {
        let e = StatementError::JobNotFound {
            job_id: "abc".into(),
        };
        assert!(e.to_string().contains("'abc'"));
        assert!(!e.is_invalid_input());
    }
}
