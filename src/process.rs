//! Request-level entry points: upload in, job out.
//!
//! [`StatementProcessor`] wires the stages together for one statement at a
//! time and owns nothing but handles: the extractor, the agent, the chat
//! model and the injected [`JobStore`]. Stages run strictly in order:
//!
//! ```text
//! validate ─▶ extract text ─▶ extract + categorise ─▶ CSV ─▶ store
//! ```

use crate::agent::StatementAgent;
use crate::chat::get_reply;
use crate::config::{ScanMode, StatementConfig};
use crate::csv_export::transactions_to_csv;
use crate::error::StatementError;
use crate::llm::{resolve_text_provider, resolve_vision_provider, ChatModel, ProviderModel};
use crate::output::{summarize_by_category, ProcessOutput};
use crate::pipeline::extract::TextExtractor;
use crate::pipeline::input::validate_upload;
use crate::store::JobStore;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Processes bank statements and serves their stored results.
pub struct StatementProcessor {
    config: StatementConfig,
    extractor: TextExtractor,
    agent: StatementAgent,
    model: Arc<dyn ChatModel>,
    store: Arc<dyn JobStore>,
}

impl StatementProcessor {
    /// Resolve providers from `config` (and the environment) and build the
    /// production engines: pdfium, Tesseract, the text model and, when one
    /// is available, the vision model.
    pub fn new(config: StatementConfig, store: Arc<dyn JobStore>) -> Result<Self, StatementError> {
        let text_provider = resolve_text_provider(&config)?;
        let vision_provider = resolve_vision_provider(&config, Some(&text_provider));
        info!(
            "LLM provider resolved; vision path {}",
            if vision_provider.is_some() { "enabled" } else { "disabled" }
        );

        let extractor = TextExtractor::from_config(&config, vision_provider);
        let model: Arc<dyn ChatModel> = Arc::new(ProviderModel::new(text_provider, &config));
        Ok(Self::with_engines(config, store, model, extractor))
    }

    /// Assemble a processor from ready-made parts.
    pub fn with_engines(
        config: StatementConfig,
        store: Arc<dyn JobStore>,
        model: Arc<dyn ChatModel>,
        extractor: TextExtractor,
    ) -> Self {
        let agent = StatementAgent::new(Arc::clone(&model), &config);
        Self {
            config,
            extractor,
            agent,
            model,
            store,
        }
    }

    pub fn config(&self) -> &StatementConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Process one uploaded statement and store the result.
    ///
    /// # Errors
    /// - input validation errors for a bad upload
    /// - `DependencyMissing` / `ExtractionFailed` from text extraction
    /// - `NoTextRecovered` when every extraction path came back blank
    /// - `ModelCallFailed` when the language model could not be reached
    pub async fn process_pdf(
        &self,
        bytes: &[u8],
        filename: &str,
        content_type: Option<&str>,
        mode: ScanMode,
    ) -> Result<ProcessOutput, StatementError> {
        let start = Instant::now();
        validate_upload(content_type, bytes, self.config.max_upload_bytes)?;

        let cb = self.config.progress_callback.as_ref();
        if let Some(cb) = cb {
            cb.on_extraction_start(filename, bytes.len());
        }

        // ── Step 1: Text ─────────────────────────────────────────────────
        let extracted = self.extractor.extract(bytes, filename, mode).await?;
        if let Some(cb) = cb {
            cb.on_text_extracted(extracted.text.len(), extracted.method);
        }
        if extracted.is_blank() {
            return Err(StatementError::NoTextRecovered);
        }

        // ── Step 2: Transactions ─────────────────────────────────────────
        let transactions = self.agent.extract_and_categorize(&extracted.text).await?;

        // ── Step 3: Store ────────────────────────────────────────────────
        let csv_content = transactions_to_csv(&transactions);
        let summary_by_category = summarize_by_category(&transactions);
        let job_id = self.store.create_id();
        self.store
            .put(job_id.clone(), transactions.clone(), csv_content);
        if let Some(cb) = cb {
            cb.on_job_stored(&job_id, transactions.len());
        }

        info!(
            "Processed '{}': {} transactions via {} text, job {} ({:?})",
            filename,
            transactions.len(),
            extracted.method,
            job_id,
            start.elapsed()
        );

        Ok(ProcessOutput {
            csv_path: format!("/api/jobs/{job_id}/csv"),
            job_id,
            transactions,
            summary_by_category,
        })
    }

    /// CSV text of a stored job.
    pub fn download_csv(&self, job_id: &str) -> Result<String, StatementError> {
        self.store
            .get(job_id)
            .map(|job| job.csv_content.clone())
            .ok_or_else(|| StatementError::JobNotFound {
                job_id: job_id.to_string(),
            })
    }

    /// Write a stored job's CSV to `path` atomically (temp file + rename).
    pub async fn write_csv(&self, job_id: &str, path: impl AsRef<Path>) -> Result<(), StatementError> {
        let csv = self.download_csv(job_id)?;
        let path = path.as_ref();
        let write_err = |source| StatementError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        let tmp_path = path.with_extension("csv.tmp");
        tokio::fs::write(&tmp_path, csv.as_bytes())
            .await
            .map_err(write_err)?;
        tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
        Ok(())
    }

    /// Answer a question about a stored job.
    pub async fn chat(&self, job_id: &str, message: &str) -> Result<String, StatementError> {
        let job = self
            .store
            .get(job_id)
            .ok_or_else(|| StatementError::JobNotFound {
                job_id: job_id.to_string(),
            })?;
        get_reply(
            self.model.as_ref(),
            &job,
            message,
            self.config.chat_context_chars,
        )
        .await
    }
}
