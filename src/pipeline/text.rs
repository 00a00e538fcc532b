//! Direct text-layer extraction.
//!
//! Two independent parsers read the embedded text layer: pdfium first, then
//! `pdf-extract` when pdfium produced next to nothing (some encodings and
//! layouts only one of them handles). Page counting follows the same order
//! with `lopdf` as the fallback. Each step returns its own `Result`; the
//! caller in [`crate::pipeline::extract`] picks the best outcome.

use crate::error::ExtractError;
use crate::pipeline::render::{bind_pdfium, load_document};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::{debug, warn};

/// Which parser produced the direct text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectSource {
    Pdfium,
    PdfExtract,
    None,
}

/// Best direct-extraction result for a document.
#[derive(Debug, Clone)]
pub struct DirectText {
    pub text: String,
    pub page_count: usize,
    pub source: DirectSource,
}

impl DirectText {
    /// Average characters per page, 0 for a page-less document.
    pub fn chars_per_page(&self) -> f64 {
        if self.page_count == 0 {
            0.0
        } else {
            self.text.chars().count() as f64 / self.page_count as f64
        }
    }
}

/// Text layer and page count via pdfium.
pub fn pdfium_text(bytes: &[u8], lib_path: Option<&Path>) -> Result<(String, usize), ExtractError> {
    let pdfium = bind_pdfium(lib_path)?;
    let document = load_document(&pdfium, bytes, "pdfium text")?;
    let pages = document.pages();
    let page_count = pages.len() as usize;

    let mut parts = Vec::with_capacity(page_count);
    for (idx, page) in pages.iter().enumerate() {
        match page.text() {
            Ok(text) => {
                let t = text.all();
                if !t.is_empty() {
                    parts.push(t);
                }
            }
            Err(e) => debug!("pdfium text: page {} unreadable: {:?}", idx + 1, e),
        }
    }
    Ok((parts.join("\n"), page_count))
}

/// Text layer via `pdf-extract`.
///
/// The crate panics on some malformed font programs; a panic is reported as
/// a failed step instead of taking the request down.
pub fn pdf_extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(ExtractError::failed("pdf-extract", e)),
        Err(_) => Err(ExtractError::failed("pdf-extract", "parser panicked")),
    }
}

/// Page count via `lopdf`.
pub fn lopdf_page_count(bytes: &[u8]) -> Result<usize, ExtractError> {
    lopdf::Document::load_mem(bytes)
        .map(|doc| doc.get_pages().len())
        .map_err(|e| ExtractError::failed("lopdf", e))
}

/// Run both parsers as needed and keep the best direct text.
///
/// A missing pdfium library is not fatal here: `pdf-extract` and `lopdf`
/// are pure Rust and still work.
pub fn extract_direct_blocking(
    bytes: &[u8],
    secondary_min_chars: usize,
    lib_path: Option<&Path>,
) -> DirectText {
    let (mut text, mut page_count, mut source) = match pdfium_text(bytes, lib_path) {
        Ok((text, pages)) => (text, pages, DirectSource::Pdfium),
        Err(e) => {
            warn!("Direct extraction via pdfium failed: {}", e);
            (String::new(), 0, DirectSource::None)
        }
    };

    if page_count == 0 {
        match lopdf_page_count(bytes) {
            Ok(n) => page_count = n,
            Err(e) => debug!("Page count via lopdf failed: {}", e),
        }
    }

    if text.trim().chars().count() < secondary_min_chars {
        match pdf_extract_text(bytes) {
            Ok(secondary) => {
                debug!("pdf-extract fallback produced {} chars", secondary.len());
                if secondary.trim().chars().count() > text.trim().chars().count() {
                    text = secondary;
                    source = DirectSource::PdfExtract;
                }
            }
            Err(e) => warn!("Secondary text extraction failed: {}", e),
        }
    }

    if text.trim().is_empty() {
        source = DirectSource::None;
    }

    DirectText {
        text,
        page_count,
        source,
    }
}
