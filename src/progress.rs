//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn ProcessProgressCallback>`] via
//! [`crate::config::StatementConfigBuilder::progress_callback`] to receive
//! events as a statement moves through extraction, the LLM passes and
//! storage. The CLI drives its spinner from these; a server could forward
//! them to a job-status record instead.
//!
//! # Example
//!
//! ```rust
//! use edgequake_statement::{ProcessProgressCallback, StatementConfig};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ProcessProgressCallback for Printer {
//!     fn on_chunk_start(&self, chunk: usize, total_chunks: usize) {
//!         eprintln!("chunk {chunk}/{total_chunks}");
//!     }
//! }
//!
//! let config = StatementConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn ProcessProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::extract::ExtractionMethod;
use std::sync::Arc;

/// Called by the pipeline at each stage boundary.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Calls arrive from whichever task runs the request,
/// so implementations must be `Send + Sync`.
pub trait ProcessProgressCallback: Send + Sync {
    /// Text extraction is about to start.
    fn on_extraction_start(&self, filename: &str, size_bytes: usize) {
        let _ = (filename, size_bytes);
    }

    /// The PDF was classified as scanned and rendered for OCR/vision.
    fn on_scanned_path(&self, page_count: usize, dpi: u32) {
        let _ = (page_count, dpi);
    }

    /// Text extraction finished.
    fn on_text_extracted(&self, chars: usize, method: ExtractionMethod) {
        let _ = (chars, method);
    }

    /// An extraction prompt for one chunk is about to be sent (1-indexed).
    fn on_chunk_start(&self, chunk: usize, total_chunks: usize) {
        let _ = (chunk, total_chunks);
    }

    /// All chunks were read and merged.
    fn on_transactions_extracted(&self, count: usize) {
        let _ = count;
    }

    /// Categorisation finished.
    fn on_categorized(&self, count: usize) {
        let _ = count;
    }

    /// The job was stored.
    fn on_job_stored(&self, job_id: &str, transactions: usize) {
        let _ = (job_id, transactions);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ProcessProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::StatementConfig`].
pub type ProgressCallback = Arc<dyn ProcessProgressCallback>;
