//! Statement agent: statement text in, categorised transactions out.
//!
//! Two model passes over a [`ChatModel`]:
//!
//! 1. **Extraction.** The text is cut into overlapping windows
//!    ([`chunk::chunk_text`]); each window is sent with the extraction prompt
//!    and the reply is mined for JSON records ([`json_block`]). Windows are
//!    merged with (date, description, amount) dedup. Zero results on a
//!    non-trivial text trigger one retry with a simpler prompt.
//! 2. **Categorisation.** All rows go out in a single numbered list; the
//!    reply is matched back by position, then by (description, amount).
//!
//! Malformed replies never fail a request: they degrade to an empty list or
//! to `Other`. Model-call failures do propagate.

pub mod categorize;
pub mod chunk;
pub mod extract;
pub mod json_block;

use crate::config::StatementConfig;
use crate::error::StatementError;
use crate::llm::{ChatModel, Prompt};
use crate::output::Transaction;
use crate::progress::ProgressCallback;
use crate::prompts::{
    categorization_system_prompt, categorization_user_prompt, EXTRACTION_SYSTEM_PROMPT,
    FALLBACK_EXTRACTION_SYSTEM_PROMPT,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extracts and categorises transactions with a language model.
pub struct StatementAgent {
    model: Arc<dyn ChatModel>,
    chunk_chars: usize,
    chunk_overlap: usize,
    fallback_min_chars: usize,
    progress: Option<ProgressCallback>,
}

impl StatementAgent {
    pub fn new(model: Arc<dyn ChatModel>, config: &StatementConfig) -> Self {
        Self {
            model,
            chunk_chars: config.chunk_chars,
            chunk_overlap: config.chunk_overlap,
            fallback_min_chars: config.fallback_min_chars,
            progress: config.progress_callback.clone(),
        }
    }

    /// Run one extraction prompt over every window of `text`.
    async fn extract_with(&self, system: &str, text: &str) -> Result<Vec<Transaction>, StatementError> {
        let chunks = chunk::chunk_text(text, self.chunk_chars, self.chunk_overlap);
        let total = chunks.len();
        let mut per_chunk = Vec::with_capacity(total);

        for (i, window) in chunks.iter().enumerate() {
            if let Some(ref cb) = self.progress {
                cb.on_chunk_start(i + 1, total);
            }
            let start = Instant::now();
            let reply = self.model.complete(&Prompt::new(system, *window)).await?;
            let found = extract::transactions_from_reply(&reply);
            debug!(
                "Chunk {}/{}: {} chars → {} transactions ({:?})",
                i + 1,
                total,
                window.len(),
                found.len(),
                start.elapsed()
            );
            per_chunk.push(found);
        }

        Ok(extract::merge_chunks(per_chunk))
    }

    /// Pull uncategorised transactions out of statement text.
    pub async fn extract_transactions(&self, text: &str) -> Result<Vec<Transaction>, StatementError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut transactions = self.extract_with(EXTRACTION_SYSTEM_PROMPT, text).await?;

        if transactions.is_empty() && text.chars().count() > self.fallback_min_chars {
            warn!("No transactions found; retrying with the fallback prompt");
            transactions = self
                .extract_with(FALLBACK_EXTRACTION_SYSTEM_PROMPT, text)
                .await?;
        }

        if let Some(ref cb) = self.progress {
            cb.on_transactions_extracted(transactions.len());
        }
        Ok(transactions)
    }

    /// Assign one category per transaction. An empty list makes no call.
    pub async fn categorize(
        &self,
        mut transactions: Vec<Transaction>,
    ) -> Result<Vec<Transaction>, StatementError> {
        if transactions.is_empty() {
            return Ok(transactions);
        }

        let prompt = Prompt::new(
            categorization_system_prompt(),
            categorization_user_prompt(&categorize::format_context(&transactions)),
        );
        let reply = self.model.complete(&prompt).await?;
        let applied = categorize::apply_categories(&mut transactions, &reply);
        if applied < transactions.len() {
            debug!(
                "Categorisation covered {}/{} rows; the rest stay Other",
                applied,
                transactions.len()
            );
        }

        if let Some(ref cb) = self.progress {
            cb.on_categorized(transactions.len());
        }
        Ok(transactions)
    }

    /// Both passes.
    pub async fn extract_and_categorize(&self, text: &str) -> Result<Vec<Transaction>, StatementError> {
        let start = Instant::now();
        info!("Statement agent: {} chars of text", text.len());

        let transactions = self.extract_transactions(text).await?;
        info!("Extracted {} transactions ({:?})", transactions.len(), start.elapsed());

        let transactions = self.categorize(transactions).await?;
        info!(
            "Categorised {} transactions ({:?} total)",
            transactions.len(),
            start.elapsed()
        );
        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{Category, TransactionType};
    use futures::future::BoxFuture;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replies in order and records every prompt it was sent.
    struct Scripted {
        replies: Mutex<VecDeque<Result<String, StatementError>>>,
        prompts: Mutex<Vec<Prompt>>,
    }

    impl Scripted {
        fn new(replies: Vec<&str>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(
                    vec![Err(StatementError::ModelCallFailed("401 unauthorized".into()))].into(),
                ),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<Prompt> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl ChatModel for Scripted {
        fn complete<'a>(&'a self, prompt: &'a Prompt) -> BoxFuture<'a, Result<String, StatementError>> {
            self.prompts.lock().unwrap().push(prompt.clone());
            let next = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("[]".to_string()));
            Box::pin(async move { next })
        }
    }

    fn agent(model: Arc<Scripted>, chunk: usize, overlap: usize) -> StatementAgent {
        let config = StatementConfig::builder()
            .chunk_chars(chunk)
            .chunk_overlap(overlap)
            .build()
            .unwrap();
        StatementAgent::new(model, &config)
    }

    #[tokio::test]
    async fn single_line_statement() {
        let model = Scripted::new(vec![
            r#"[{"date":"01/02/2024","description":"COFFEE SHOP","amount":"4.50","type":"debit"}]"#,
            r#"[{"date":"01/02/2024","description":"COFFEE SHOP","amount":"4.50","type":"debit","category":"Dining"}]"#,
        ]);
        let txns = agent(Arc::clone(&model), 100_000, 3_000)
            .extract_and_categorize("01/02/2024 COFFEE SHOP 4.50 debit")
            .await
            .unwrap();

        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].amount, "4.50");
        assert_eq!(txns[0].kind, TransactionType::Debit);
        assert_eq!(txns[0].category, Some(Category::Dining));

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0].user, "01/02/2024 COFFEE SHOP 4.50 debit");
        assert!(prompts[1].user.contains("[1] date: 01/02/2024 | description: COFFEE SHOP"));
    }

    #[tokio::test]
    async fn blank_text_makes_no_calls() {
        let model = Scripted::new(vec![]);
        let txns = agent(Arc::clone(&model), 100_000, 3_000)
            .extract_and_categorize("  \n ")
            .await
            .unwrap();
        assert!(txns.is_empty());
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn long_text_is_chunked_and_deduplicated() {
        let row = r#"{"date":"d2","description":"BOUNDARY","amount":"2.00"}"#;
        let first = format!(r#"[{{"date":"d1","description":"A","amount":"1.00"}},{row}]"#);
        let second = format!(r#"[{row},{{"date":"d3","description":"C","amount":"3.00"}}]"#);
        let model = Scripted::new(vec![first.as_str(), second.as_str()]);
        let text = "x".repeat(150);
        let txns = agent(Arc::clone(&model), 100, 20)
            .extract_transactions(&text)
            .await
            .unwrap();

        assert_eq!(model.prompts().len(), chunk::expected_chunks(150, 100, 20));
        let descs: Vec<_> = txns.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descs, vec!["A", "BOUNDARY", "C"]);
    }

    #[tokio::test]
    async fn zero_results_on_long_text_retry_with_fallback_prompt() {
        let model = Scripted::new(vec![
            "I found no transactions.",
            r#"[{"date":"05/03","description":"ATM","amount":"60.00","type":"Debit"}]"#,
        ]);
        let text = "statement line ".repeat(40);
        let txns = agent(Arc::clone(&model), 100_000, 3_000)
            .extract_transactions(&text)
            .await
            .unwrap();

        assert_eq!(txns.len(), 1);
        let prompts = model.prompts();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0].system, EXTRACTION_SYSTEM_PROMPT);
        assert_eq!(prompts[1].system, FALLBACK_EXTRACTION_SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn short_text_gets_no_fallback() {
        let model = Scripted::new(vec!["[]"]);
        let txns = agent(Arc::clone(&model), 100_000, 3_000)
            .extract_transactions("Opening balance 10.00")
            .await
            .unwrap();
        assert!(txns.is_empty());
        assert_eq!(model.prompts().len(), 1);
    }

    #[tokio::test]
    async fn malformed_categorisation_reply_means_other() {
        let model = Scripted::new(vec![
            r#"[{"date":"1","description":"A","amount":"1"},{"date":"2","description":"B","amount":"2","type":"cr"}]"#,
            "not json at all",
        ]);
        let txns = agent(model, 100_000, 3_000)
            .extract_and_categorize("1 A 1\n2 B 2")
            .await
            .unwrap();
        assert_eq!(txns.len(), 2);
        assert!(txns.iter().all(|t| t.category == Some(Category::Other)));
        assert_eq!(txns[1].kind, TransactionType::Credit);
    }

    #[tokio::test]
    async fn model_failure_propagates() {
        let err = agent(Scripted::failing(), 100_000, 3_000)
            .extract_and_categorize("01/02 COFFEE 4.50")
            .await
            .unwrap_err();
        assert!(matches!(err, StatementError::ModelCallFailed(_)));
    }
}
