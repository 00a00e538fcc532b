//! # edgequake-statement
//!
//! Turn bank-statement PDFs into categorised transactions and CSV.
//!
//! ## Why this crate?
//!
//! Statements arrive in two flavours: exports with a real text layer, and
//! scans that are nothing but page images. Regex-based parsers break on every
//! new bank layout. Instead this crate recovers plain text first (text layer,
//! Tesseract OCR or a vision model, whichever yields most) and lets a language
//! model read the transactions out of it as a human would.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Input     content type, size and %PDF magic checks
//!  ├─ 2. Text      pdfium text layer, pdf-extract fallback
//!  ├─ 3. Scan      low text per page → render → OCR and/or vision
//!  ├─ 4. Extract   chunked LLM extraction, JSON recovery, dedup
//!  ├─ 5. Classify  one LLM pass assigning fixed categories
//!  └─ 6. Store     CSV + in-memory job, chat over the job afterwards
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_statement::{MemoryJobStore, ScanMode, StatementConfig, StatementProcessor};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let processor = StatementProcessor::new(
//!         StatementConfig::default(),
//!         Arc::new(MemoryJobStore::new()),
//!     )?;
//!     let bytes = std::fs::read("statement.pdf")?;
//!     let output = processor
//!         .process_pdf(&bytes, "statement.pdf", Some("application/pdf"), ScanMode::Auto)
//!         .await?;
//!     println!("{}", processor.download_csv(&output.job_id)?);
//!     println!("{}", processor.chat(&output.job_id, "What did I spend most on?").await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `statement2csv` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when embedding the library in a service:
//! ```toml
//! edgequake-statement = { version = "0.1", default-features = false }
//! ```
//!
//! ## Native Dependencies
//!
//! Text-layer PDFs need nothing beyond the crate. Scanned PDFs need the
//! pdfium shared library (`PDFIUM_LIB_PATH`) and either the `tesseract`
//! binary on `PATH` or a vision-capable provider.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod agent;
pub mod chat;
pub mod config;
pub mod csv_export;
pub mod error;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use agent::StatementAgent;
pub use config::{ScanMode, StatementConfig, StatementConfigBuilder};
pub use csv_export::{parse_csv, transactions_to_csv, CSV_HEADER};
pub use error::{Dependency, ExtractError, StatementError};
pub use llm::{ChatModel, Prompt, ProviderModel};
pub use output::{summarize_by_category, Category, CategorySummary, ProcessOutput, Transaction, TransactionType};
pub use pipeline::extract::{extract_text_from_pdf, ExtractedText, ExtractionMethod, TextExtractor};
pub use process::StatementProcessor;
pub use progress::{NoopProgressCallback, ProcessProgressCallback, ProgressCallback};
pub use store::{Job, JobStore, MemoryJobStore};
