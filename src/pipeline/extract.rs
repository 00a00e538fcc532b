//! Text extraction orchestrator.
//!
//! Decides which of the pipeline stages run for a given PDF:
//!
//! ```text
//! direct text ──(≥ min chars/page)──▶ done
//!      │
//!      └─(scanned)──▶ plan_scan ──▶ render ──▶ OCR and/or vision ──▶ best text
//! ```
//!
//! Sub-steps report through [`ExtractError`]. A missing native dependency
//! is surfaced to the caller with an install hint; any other sub-step
//! failure degrades that method to empty text so a sibling can still win.

use crate::config::{ScanMode, StatementConfig};
use crate::error::{ExtractError, StatementError};
use crate::llm::{resolve_text_provider, resolve_vision_provider};
use crate::pipeline::ocr::{OcrEngine, TesseractOcr};
use crate::pipeline::preprocess::preprocess;
use crate::pipeline::render::render_pages_blocking;
use crate::pipeline::text::{extract_direct_blocking, DirectSource};
use crate::pipeline::vision::{LlmVision, VisionEngine};
use edgequake_llm::LLMProvider;
use image::DynamicImage;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// How the returned text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Nothing usable was recovered.
    Empty,
    /// pdfium text layer.
    Direct,
    /// `pdf-extract` text layer.
    Secondary,
    /// Tesseract over rendered pages.
    Ocr,
    /// Vision model over rendered pages.
    Vision,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtractionMethod::Empty => "empty",
            ExtractionMethod::Direct => "direct",
            ExtractionMethod::Secondary => "secondary",
            ExtractionMethod::Ocr => "ocr",
            ExtractionMethod::Vision => "vision",
        };
        f.write_str(s)
    }
}

/// Best-effort transcription of a statement.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: usize,
    pub method: ExtractionMethod,
}

impl ExtractedText {
    fn empty(page_count: usize) -> Self {
        Self {
            text: String::new(),
            page_count,
            method: ExtractionMethod::Empty,
        }
    }

    /// True when only whitespace was recovered.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

// ── Scan planning ───────────────────────────────────────────────────────────

/// Which engines read a scanned document, and at what resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPlan {
    /// Tesseract only.
    OcrOnly { dpi: u32 },
    /// Vision model only.
    VisionOnly { dpi: u32 },
    /// Vision model; Tesseract on the same pages if vision returns nothing.
    VisionThenOcr { dpi: u32 },
    /// Both engines; the longer trimmed text wins.
    Both { dpi: u32 },
}

impl ScanPlan {
    pub fn dpi(&self) -> u32 {
        match *self {
            ScanPlan::OcrOnly { dpi }
            | ScanPlan::VisionOnly { dpi }
            | ScanPlan::VisionThenOcr { dpi }
            | ScanPlan::Both { dpi } => dpi,
        }
    }
}

/// Choose the scanned-document path from the page count and requested mode.
pub fn plan_scan(page_count: usize, mode: ScanMode, config: &StatementConfig) -> ScanPlan {
    match mode {
        ScanMode::Ocr => ScanPlan::OcrOnly {
            dpi: config.ocr_dpi,
        },
        ScanMode::Vision => ScanPlan::VisionOnly {
            dpi: config.vision_dpi,
        },
        ScanMode::Auto if page_count <= config.vision_only_max_pages => ScanPlan::VisionThenOcr {
            dpi: config.vision_dpi,
        },
        ScanMode::Auto => ScanPlan::Both {
            dpi: config.ocr_dpi,
        },
    }
}

/// Keep whichever text is longer once trimmed. OCR wins ties.
pub fn pick_longer(ocr: String, vision: String) -> (String, ExtractionMethod) {
    let vision = vision.trim();
    if !vision.is_empty() && vision.chars().count() > ocr.trim().chars().count() {
        (vision.to_string(), ExtractionMethod::Vision)
    } else if ocr.trim().is_empty() {
        (String::new(), ExtractionMethod::Empty)
    } else {
        (ocr, ExtractionMethod::Ocr)
    }
}

/// Resolve a sub-step outcome: missing dependencies propagate, other
/// failures degrade to empty text.
fn settle(result: Result<String, ExtractError>) -> Result<String, StatementError> {
    match result {
        Ok(text) => Ok(text),
        Err(e @ ExtractError::DependencyMissing(..)) => Err(e.into()),
        Err(e) => {
            warn!("{}; continuing without it", e);
            Ok(String::new())
        }
    }
}

fn labelled(text: String, method: ExtractionMethod) -> (String, ExtractionMethod) {
    if text.trim().is_empty() {
        (String::new(), ExtractionMethod::Empty)
    } else {
        (text, method)
    }
}

// ── Extractor ───────────────────────────────────────────────────────────────

/// Turns PDF bytes into text with the configured engines.
pub struct TextExtractor {
    config: StatementConfig,
    ocr: Arc<dyn OcrEngine>,
    vision: Option<Arc<dyn VisionEngine>>,
}

impl TextExtractor {
    pub fn new(
        config: &StatementConfig,
        ocr: Arc<dyn OcrEngine>,
        vision: Option<Arc<dyn VisionEngine>>,
    ) -> Self {
        Self {
            config: config.clone(),
            ocr,
            vision,
        }
    }

    /// Tesseract plus, when a provider is given, the vision model.
    pub fn from_config(config: &StatementConfig, vision_provider: Option<Arc<dyn LLMProvider>>) -> Self {
        let vision = vision_provider
            .map(|p| Arc::new(LlmVision::new(p, config)) as Arc<dyn VisionEngine>);
        Self::new(config, Arc::new(TesseractOcr::from_config(config)), vision)
    }

    /// Extract the best available text from `bytes`.
    pub async fn extract(
        &self,
        bytes: &[u8],
        filename: &str,
        mode: ScanMode,
    ) -> Result<ExtractedText, StatementError> {
        let start = Instant::now();
        info!(
            "Extracting text from '{}' ({} bytes, mode={})",
            filename,
            bytes.len(),
            mode
        );

        let data = Arc::new(bytes.to_vec());
        let lib_path = self.config.pdfium_lib_path.clone();
        let secondary_min = self.config.secondary_parser_min_chars;

        let direct = {
            let data = Arc::clone(&data);
            let lib_path = lib_path.clone();
            tokio::task::spawn_blocking(move || {
                extract_direct_blocking(&data, secondary_min, lib_path.as_deref())
            })
            .await
            .map_err(|e| StatementError::Internal(format!("direct extraction task panicked: {e}")))?
        };

        info!(
            "Direct text: {} chars over {} pages ({:?})",
            direct.text.len(),
            direct.page_count,
            start.elapsed()
        );

        if direct.page_count == 0 {
            return Ok(ExtractedText::empty(0));
        }

        let avg = direct.chars_per_page();
        if avg >= self.config.min_text_per_page as f64 {
            let method = match direct.source {
                DirectSource::PdfExtract => ExtractionMethod::Secondary,
                _ => ExtractionMethod::Direct,
            };
            return Ok(ExtractedText {
                text: direct.text,
                page_count: direct.page_count,
                method,
            });
        }

        let page_count = direct.page_count;
        let plan = plan_scan(page_count, mode, &self.config);
        info!(
            "Low text per page ({:.0}); scanned path {:?} for {} pages",
            avg, plan, page_count
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_scanned_path(page_count, plan.dpi());
        }

        let max_px = self.config.max_rendered_pixels;
        let dpi = plan.dpi();
        let images = tokio::task::spawn_blocking(move || {
            render_pages_blocking(&data, dpi, max_px, lib_path.as_deref())
        })
        .await
        .map_err(|e| StatementError::Internal(format!("render task panicked: {e}")))??;

        if images.is_empty() {
            return Ok(ExtractedText::empty(page_count));
        }

        let (text, method) = self.scan_images(images, plan).await?;
        info!(
            "Scanned path done: {} chars via {} ({:?} total)",
            text.len(),
            method,
            start.elapsed()
        );
        Ok(ExtractedText {
            text,
            page_count,
            method,
        })
    }

    /// Run the engines `plan` names over already-rendered pages.
    pub async fn scan_images(
        &self,
        images: Vec<DynamicImage>,
        plan: ScanPlan,
    ) -> Result<(String, ExtractionMethod), StatementError> {
        let pages = Arc::new(images);
        match plan {
            ScanPlan::OcrOnly { .. } => {
                let text = settle(self.run_ocr(Arc::clone(&pages)).await)?;
                Ok(labelled(text, ExtractionMethod::Ocr))
            }
            ScanPlan::VisionOnly { .. } => {
                let text = self.run_vision(&pages).await;
                Ok(labelled(text.trim().to_string(), ExtractionMethod::Vision))
            }
            ScanPlan::VisionThenOcr { .. } => {
                let vision = self.run_vision(&pages).await;
                if !vision.trim().is_empty() {
                    return Ok((vision.trim().to_string(), ExtractionMethod::Vision));
                }
                debug!("Vision produced nothing; falling back to OCR");
                let text = settle(self.run_ocr(Arc::clone(&pages)).await)?;
                Ok(labelled(text, ExtractionMethod::Ocr))
            }
            ScanPlan::Both { .. } => {
                let ocr = self.run_ocr(Arc::clone(&pages)).await;
                let vision = self.run_vision(&pages).await;
                let ocr_text = match ocr {
                    Err(e @ ExtractError::DependencyMissing(..)) if vision.trim().is_empty() => {
                        return Err(e.into());
                    }
                    Err(e @ ExtractError::DependencyMissing(..)) => {
                        warn!("{}; using vision text", e);
                        String::new()
                    }
                    other => settle(other)?,
                };
                Ok(pick_longer(ocr_text, vision))
            }
        }
    }

    async fn run_ocr(&self, pages: Arc<Vec<DynamicImage>>) -> Result<String, ExtractError> {
        let ocr = Arc::clone(&self.ocr);
        let deskew = self.config.deskew;
        let start = Instant::now();
        let result = tokio::task::spawn_blocking(move || {
            let prepared: Vec<DynamicImage> = pages.iter().map(|p| preprocess(p, deskew)).collect();
            ocr.recognize(&prepared)
        })
        .await
        .map_err(|e| ExtractError::failed("ocr", format!("task panicked: {e}")))?;
        if let Ok(ref text) = result {
            info!("OCR done: {} chars ({:?})", text.len(), start.elapsed());
        }
        result
    }

    async fn run_vision(&self, pages: &[DynamicImage]) -> String {
        let Some(ref vision) = self.vision else {
            info!("Vision skipped: no vision provider configured");
            return String::new();
        };
        let start = Instant::now();
        match vision.transcribe(pages).await {
            Ok(text) => {
                info!("Vision done: {} chars ({:?})", text.len(), start.elapsed());
                text
            }
            Err(e) => {
                warn!("{}; continuing without vision text", e);
                String::new()
            }
        }
    }
}

/// Extract statement text with engines resolved from `config`.
///
/// Returns `DependencyMissing` when pdfium or Tesseract is needed but not
/// installed, `ExtractionFailed` for other fatal parse/render failures, and
/// an empty string when the document has no pages.
pub async fn extract_text_from_pdf(
    bytes: &[u8],
    filename: &str,
    mode: Option<&str>,
    config: &StatementConfig,
) -> Result<String, StatementError> {
    let text_provider = resolve_text_provider(config).ok();
    let vision = resolve_vision_provider(config, text_provider.as_ref());
    let extractor = TextExtractor::from_config(config, vision);
    let extracted = extractor
        .extract(bytes, filename, ScanMode::parse_lenient(mode))
        .await?;
    Ok(extracted.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Dependency;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeOcr {
        result: Result<String, ExtractError>,
        calls: AtomicUsize,
    }

    impl FakeOcr {
        fn new(result: Result<String, ExtractError>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl OcrEngine for FakeOcr {
        fn recognize(&self, _pages: &[DynamicImage]) -> Result<String, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    struct FakeVision(Result<String, ExtractError>);

    impl VisionEngine for FakeVision {
        fn transcribe<'a>(
            &'a self,
            _pages: &'a [DynamicImage],
        ) -> BoxFuture<'a, Result<String, ExtractError>> {
            let r = self.0.clone();
            Box::pin(async move { r })
        }
    }

    fn pages(n: usize) -> Vec<DynamicImage> {
        (0..n).map(|_| DynamicImage::new_luma8(16, 16)).collect()
    }

    fn extractor(ocr: Arc<FakeOcr>, vision: Option<FakeVision>) -> TextExtractor {
        let config = StatementConfig::builder().deskew(false).build().unwrap();
        TextExtractor::new(
            &config,
            ocr,
            vision.map(|v| Arc::new(v) as Arc<dyn VisionEngine>),
        )
    }

    #[test]
    fn plan_follows_page_count_and_mode() {
        let c = StatementConfig::default();
        assert_eq!(plan_scan(3, ScanMode::Auto, &c), ScanPlan::VisionThenOcr { dpi: 150 });
        assert_eq!(plan_scan(5, ScanMode::Auto, &c), ScanPlan::VisionThenOcr { dpi: 150 });
        assert_eq!(plan_scan(6, ScanMode::Auto, &c), ScanPlan::Both { dpi: 300 });
        assert_eq!(plan_scan(2, ScanMode::Ocr, &c), ScanPlan::OcrOnly { dpi: 300 });
        assert_eq!(plan_scan(40, ScanMode::Vision, &c), ScanPlan::VisionOnly { dpi: 150 });
    }

    #[test]
    fn longer_trimmed_text_wins() {
        assert_eq!(
            pick_longer("short".into(), "  much longer text  ".into()),
            ("much longer text".to_string(), ExtractionMethod::Vision)
        );
        assert_eq!(
            pick_longer("same".into(), "sam".into()),
            ("same".to_string(), ExtractionMethod::Ocr)
        );
        assert_eq!(
            pick_longer("  ".into(), "".into()),
            (String::new(), ExtractionMethod::Empty)
        );
    }

    #[tokio::test]
    async fn short_scan_without_vision_provider_falls_back_to_ocr() {
        let ocr = FakeOcr::new(Ok("01/02/2024 COFFEE SHOP 4.50".into()));
        let ex = extractor(Arc::clone(&ocr), None);
        let (text, method) = ex
            .scan_images(pages(3), ScanPlan::VisionThenOcr { dpi: 150 })
            .await
            .unwrap();
        assert_eq!(method, ExtractionMethod::Ocr);
        assert!(text.contains("COFFEE SHOP"));
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn short_scan_with_vision_text_skips_ocr() {
        let ocr = FakeOcr::new(Ok("ocr".into()));
        let ex = extractor(Arc::clone(&ocr), Some(FakeVision(Ok(" vision text ".into()))));
        let (text, method) = ex
            .scan_images(pages(2), ScanPlan::VisionThenOcr { dpi: 150 })
            .await
            .unwrap();
        assert_eq!((text.as_str(), method), ("vision text", ExtractionMethod::Vision));
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_tesseract_surfaces_on_forced_ocr() {
        let ocr = FakeOcr::new(Err(ExtractError::DependencyMissing(
            Dependency::Tesseract,
            "not found".into(),
        )));
        let ex = extractor(ocr, None);
        let err = ex
            .scan_images(pages(1), ScanPlan::OcrOnly { dpi: 300 })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StatementError::DependencyMissing {
                dependency: Dependency::Tesseract,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn other_ocr_failures_degrade_to_empty() {
        let ocr = FakeOcr::new(Err(ExtractError::failed("ocr", "exit code 1")));
        let ex = extractor(ocr, None);
        let (text, method) = ex
            .scan_images(pages(1), ScanPlan::OcrOnly { dpi: 300 })
            .await
            .unwrap();
        assert!(text.is_empty());
        assert_eq!(method, ExtractionMethod::Empty);
    }

    #[tokio::test]
    async fn long_scan_keeps_the_longer_engine_output() {
        let ocr = FakeOcr::new(Ok("a few OCR words".into()));
        let ex = extractor(
            ocr,
            Some(FakeVision(Ok("a much longer vision transcription of the page".into()))),
        );
        let (_, method) = ex
            .scan_images(pages(2), ScanPlan::Both { dpi: 300 })
            .await
            .unwrap();
        assert_eq!(method, ExtractionMethod::Vision);
    }

    #[tokio::test]
    async fn long_scan_uses_vision_when_tesseract_missing() {
        let ocr = FakeOcr::new(Err(ExtractError::DependencyMissing(
            Dependency::Tesseract,
            "not found".into(),
        )));
        let ex = extractor(ocr, Some(FakeVision(Ok("vision only".into()))));
        let (text, method) = ex
            .scan_images(pages(2), ScanPlan::Both { dpi: 300 })
            .await
            .unwrap();
        assert_eq!((text.as_str(), method), ("vision only", ExtractionMethod::Vision));
    }

    #[tokio::test]
    async fn vision_failure_degrades_to_empty() {
        let ocr = FakeOcr::new(Ok(String::new()));
        let ex = extractor(ocr, Some(FakeVision(Err(ExtractError::failed("vision", "429")))));
        let (text, method) = ex
            .scan_images(pages(1), ScanPlan::VisionOnly { dpi: 150 })
            .await
            .unwrap();
        assert!(text.is_empty());
        assert_eq!(method, ExtractionMethod::Empty);
    }

    #[tokio::test]
    async fn unparseable_document_has_no_pages() {
        let config = StatementConfig::builder()
            .pdfium_lib_path("/nonexistent/libpdfium.so")
            .build()
            .unwrap();
        let ex = TextExtractor::new(&config, FakeOcr::new(Ok("x".into())), None);
        let out = ex
            .extract(b"%PDF-1.4 truncated", "broken.pdf", ScanMode::Auto)
            .await
            .unwrap();
        assert_eq!(out.page_count, 0);
        assert_eq!(out.method, ExtractionMethod::Empty);
        assert!(out.is_blank());
    }
}
