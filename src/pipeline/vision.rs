//! Vision-model transcription of page images.
//!
//! Each page becomes one multimodal call: the transcription prompt from
//! [`crate::prompts`] plus the page as a JPEG attachment. Calls run one page
//! at a time in page order.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient. Each page is retried
//! with exponential backoff (`retry_backoff_ms * 2^attempt`); a page that
//! still fails is skipped so the rest of the statement survives.

use crate::config::StatementConfig;
use crate::error::ExtractError;
use crate::pipeline::encode::encode_for_vision;
use crate::prompts::VISION_PAGE_PROMPT;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use futures::future::BoxFuture;
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Something that turns page images into text with a multimodal model.
pub trait VisionEngine: Send + Sync {
    /// Transcribe every page and return the page texts joined in order.
    fn transcribe<'a>(
        &'a self,
        pages: &'a [DynamicImage],
    ) -> BoxFuture<'a, Result<String, ExtractError>>;
}

/// [`VisionEngine`] backed by an edgequake-llm provider.
pub struct LlmVision {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    max_long_side: u32,
    jpeg_quality: u8,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl LlmVision {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &StatementConfig) -> Self {
        Self {
            provider,
            options: CompletionOptions {
                temperature: Some(config.temperature),
                max_tokens: Some(config.vision_max_tokens),
                ..Default::default()
            },
            max_long_side: config.vision_max_long_side,
            jpeg_quality: config.vision_jpeg_quality,
            max_retries: config.vision_max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        }
    }

    async fn transcribe_page(&self, page_num: usize, page: &DynamicImage) -> Result<String, ExtractError> {
        let image = encode_for_vision(page, self.max_long_side, self.jpeg_quality)
            .map_err(|e| ExtractError::failed("vision", format!("page {}: {}", page_num, e)))?;
        let messages = vec![ChatMessage::user_with_images(VISION_PAGE_PROMPT, vec![image])];

        let start = Instant::now();
        let mut last_err = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "Vision page {}: retry {}/{} after {}ms",
                    page_num, attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.provider.chat(&messages, Some(&self.options)).await {
                Ok(response) => {
                    debug!(
                        "Vision page {}: {} input tokens, {} output tokens, {:?}",
                        page_num,
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(response.content);
                }
                Err(e) => {
                    last_err = e.to_string();
                    warn!("Vision page {}: attempt {} failed: {}", page_num, attempt + 1, last_err);
                }
            }
        }

        Err(ExtractError::failed(
            "vision",
            format!("page {} after {} retries: {}", page_num, self.max_retries, last_err),
        ))
    }
}

impl VisionEngine for LlmVision {
    fn transcribe<'a>(
        &'a self,
        pages: &'a [DynamicImage],
    ) -> BoxFuture<'a, Result<String, ExtractError>> {
        Box::pin(async move {
            let mut texts = Vec::with_capacity(pages.len());
            let mut last_err = None;

            for (idx, page) in pages.iter().enumerate() {
                match self.transcribe_page(idx + 1, page).await {
                    Ok(text) => texts.push(text),
                    Err(e) => {
                        warn!("Vision page {} skipped: {}", idx + 1, e);
                        last_err = Some(e);
                    }
                }
            }

            match last_err {
                Some(e) if texts.is_empty() => Err(e),
                _ => Ok(texts.join("\n\n")),
            }
        })
    }
}
