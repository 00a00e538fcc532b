//! Pipeline stages that turn uploaded PDF bytes into statement text.
//!
//! Each submodule implements exactly one step so it can be tested alone and
//! swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ text ──(too little text per page)──▶ render ──▶ preprocess ──▶ ocr
//! (checks)  (pdfium, pdf-extract)               (pdfium)   (deskew…)  ╲
//!                                                          encode ──▶ vision
//! ```
//!
//! 1. [`input`]      — validate the upload (content type, size, magic bytes)
//! 2. [`text`]       — direct text-layer extraction and page counting
//! 3. [`render`]     — rasterise pages at the DPI chosen by the scan plan
//! 4. [`preprocess`] — deskew, grayscale, contrast, sharpen, upscale for OCR
//! 5. [`ocr`]        — Tesseract over the preprocessed pages
//! 6. [`encode`]     — resize + JPEG + base64 for vision uploads
//! 7. [`vision`]     — one multimodal call per page
//! 8. [`extract`]    — the orchestrator deciding which of the above run

pub mod encode;
pub mod extract;
pub mod input;
pub mod ocr;
pub mod preprocess;
pub mod render;
pub mod text;
pub mod vision;
