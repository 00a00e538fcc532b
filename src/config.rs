//! Configuration types for statement processing.
//!
//! Every knob of the pipeline lives in [`StatementConfig`], built via its
//! [`StatementConfigBuilder`]. The defaults are the thresholds the extraction
//! heuristics were tuned with; change them deliberately; several are
//! observable behaviour (for example the vision-only page limit).

use crate::error::StatementError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for processing a bank statement.
///
/// # Example
/// ```rust
/// use edgequake_statement::{ScanMode, StatementConfig};
///
/// let config = StatementConfig::builder()
///     .ocr_dpi(300)
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// assert_eq!(config.vision_only_max_pages, 5);
/// ```
#[derive(Clone)]
pub struct StatementConfig {
    // ── Text extraction ──────────────────────────────────────────────────
    /// Average characters per page below which a PDF counts as scanned. Default: 100.
    pub min_text_per_page: usize,

    /// Trimmed characters below which the secondary parser is tried. Default: 50.
    pub secondary_parser_min_chars: usize,

    /// Render DPI for the OCR path. Default: 300.
    ///
    /// Camera-scanned pages need the extra resolution for Tesseract.
    pub ocr_dpi: u32,

    /// Render DPI for the vision-only path. Default: 150.
    pub vision_dpi: u32,

    /// Scanned PDFs with at most this many pages skip OCR in auto mode. Default: 5.
    ///
    /// OCR is slow on camera-quality scans; a handful of pages is cheaper to
    /// send to a vision model.
    pub vision_only_max_pages: usize,

    /// Safety cap on either rendered dimension, in pixels. Default: 4000.
    pub max_rendered_pixels: u32,

    /// Path to an existing pdfium library. Falls back to `PDFIUM_LIB_PATH`,
    /// then the working directory, then the system library search path.
    pub pdfium_lib_path: Option<PathBuf>,

    // ── OCR ──────────────────────────────────────────────────────────────
    /// Tesseract binary. Default: `tesseract` (resolved via PATH).
    pub tesseract_path: String,

    /// Tesseract page segmentation mode. Default: 3 (fully automatic).
    pub tesseract_psm: u8,

    /// Tesseract language. Default: `eng`.
    pub ocr_language: String,

    /// Estimate and correct page rotation before OCR. Default: true.
    pub deskew: bool,

    // ── Vision ───────────────────────────────────────────────────────────
    /// Longest side of a page image sent to the vision model. Default: 2000.
    pub vision_max_long_side: u32,

    /// JPEG quality for vision uploads. Default: 85.
    pub vision_jpeg_quality: u8,

    /// Maximum tokens the vision model may generate per page. Default: 4096.
    pub vision_max_tokens: usize,

    /// Retries per vision page on a failed call. Default: 2.
    pub vision_max_retries: u32,

    /// Initial vision retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Vision provider name (e.g. "openai", "gemini"). None reuses `provider_name`.
    pub vision_provider_name: Option<String>,

    /// Vision model identifier. None reuses `model`.
    pub vision_model: Option<String>,

    /// Pre-constructed vision provider. Takes precedence over the names.
    pub vision_provider: Option<Arc<dyn LLMProvider>>,

    // ── Statement agent ──────────────────────────────────────────────────
    /// Characters of statement text per extraction call. Default: 100 000.
    pub chunk_chars: usize,

    /// Characters shared by consecutive chunks. Default: 3 000.
    ///
    /// Large enough that a transaction straddling a boundary appears whole in
    /// at least one chunk.
    pub chunk_overlap: usize,

    /// Text longer than this gets a second, simpler extraction attempt when
    /// the first found nothing. Default: 400.
    pub fallback_min_chars: usize,

    /// Sampling temperature for extraction, categorisation and chat. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens per text completion. Default: 8192.
    pub max_tokens: usize,

    /// LLM provider name for text prompts. None auto-detects from the environment.
    pub provider_name: Option<String>,

    /// LLM model identifier. None uses the provider default.
    pub model: Option<String>,

    /// Pre-constructed text provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    // ── Chat / upload ────────────────────────────────────────────────────
    /// Characters of CSV embedded in a chat prompt. Default: 15 000.
    pub chat_context_chars: usize,

    /// Upload size ceiling in bytes. Default: 20 MiB.
    pub max_upload_bytes: usize,

    /// Optional progress callback for stage events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for StatementConfig {
    fn default() -> Self {
        Self {
            min_text_per_page: 100,
            secondary_parser_min_chars: 50,
            ocr_dpi: 300,
            vision_dpi: 150,
            vision_only_max_pages: 5,
            max_rendered_pixels: 4000,
            pdfium_lib_path: None,
            tesseract_path: "tesseract".to_string(),
            tesseract_psm: 3,
            ocr_language: "eng".to_string(),
            deskew: true,
            vision_max_long_side: 2000,
            vision_jpeg_quality: 85,
            vision_max_tokens: 4096,
            vision_max_retries: 2,
            retry_backoff_ms: 500,
            vision_provider_name: None,
            vision_model: None,
            vision_provider: None,
            chunk_chars: 100_000,
            chunk_overlap: 3_000,
            fallback_min_chars: 400,
            temperature: 0.0,
            max_tokens: 8192,
            provider_name: None,
            model: None,
            provider: None,
            chat_context_chars: 15_000,
            max_upload_bytes: 20 * 1024 * 1024,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for StatementConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementConfig")
            .field("min_text_per_page", &self.min_text_per_page)
            .field("ocr_dpi", &self.ocr_dpi)
            .field("vision_dpi", &self.vision_dpi)
            .field("vision_only_max_pages", &self.vision_only_max_pages)
            .field("tesseract_path", &self.tesseract_path)
            .field("deskew", &self.deskew)
            .field("vision_model", &self.vision_model)
            .field(
                "vision_provider",
                &self.vision_provider.as_ref().map(|_| "<dyn LLMProvider>"),
            )
            .field("chunk_chars", &self.chunk_chars)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl StatementConfig {
    /// Create a new builder for `StatementConfig`.
    pub fn builder() -> StatementConfigBuilder {
        StatementConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`StatementConfig`].
#[derive(Debug)]
pub struct StatementConfigBuilder {
    config: StatementConfig,
}

impl StatementConfigBuilder {
    pub fn min_text_per_page(mut self, chars: usize) -> Self {
        self.config.min_text_per_page = chars;
        self
    }

    pub fn ocr_dpi(mut self, dpi: u32) -> Self {
        self.config.ocr_dpi = dpi.clamp(72, 600);
        self
    }

    pub fn vision_dpi(mut self, dpi: u32) -> Self {
        self.config.vision_dpi = dpi.clamp(72, 600);
        self
    }

    pub fn vision_only_max_pages(mut self, pages: usize) -> Self {
        self.config.vision_only_max_pages = pages;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<String>) -> Self {
        self.config.tesseract_path = path.into();
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn deskew(mut self, v: bool) -> Self {
        self.config.deskew = v;
        self
    }

    pub fn vision_jpeg_quality(mut self, q: u8) -> Self {
        self.config.vision_jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn vision_max_retries(mut self, n: u32) -> Self {
        self.config.vision_max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn vision_provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.vision_provider_name = Some(name.into());
        self
    }

    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.config.vision_model = Some(model.into());
        self
    }

    pub fn vision_provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.vision_provider = Some(provider);
        self
    }

    pub fn chunk_chars(mut self, n: usize) -> Self {
        self.config.chunk_chars = n;
        self
    }

    pub fn chunk_overlap(mut self, n: usize) -> Self {
        self.config.chunk_overlap = n;
        self
    }

    pub fn fallback_min_chars(mut self, n: usize) -> Self {
        self.config.fallback_min_chars = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn chat_context_chars(mut self, n: usize) -> Self {
        self.config.chat_context_chars = n;
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<StatementConfig, StatementError> {
        let c = &self.config;
        if c.chunk_chars == 0 {
            return Err(StatementError::InvalidConfig(
                "chunk_chars must be ≥ 1".into(),
            ));
        }
        if c.chunk_overlap >= c.chunk_chars {
            return Err(StatementError::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_chars ({})",
                c.chunk_overlap, c.chunk_chars
            )));
        }
        if c.max_upload_bytes == 0 {
            return Err(StatementError::InvalidConfig(
                "max_upload_bytes must be ≥ 1".into(),
            ));
        }
        if c.tesseract_path.trim().is_empty() {
            return Err(StatementError::InvalidConfig(
                "tesseract_path must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which engine reads a scanned PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Pick by page count: vision for short documents, OCR and vision for long ones.
    #[default]
    Auto,
    /// Tesseract only.
    Ocr,
    /// Vision model only.
    Vision,
}

impl ScanMode {
    /// Parse a caller-supplied mode. Unknown or empty values mean [`ScanMode::Auto`].
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("ocr") => ScanMode::Ocr,
            Some("vision") => ScanMode::Vision,
            _ => ScanMode::Auto,
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanMode::Auto => f.write_str("auto"),
            ScanMode::Ocr => f.write_str("ocr"),
            ScanMode::Vision => f.write_str("vision"),
        }
    }
}
