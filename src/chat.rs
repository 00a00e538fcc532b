//! Free-form questions about a stored job.
//!
//! Each call is independent: the job's CSV (truncated) and the question go
//! out in one prompt and the model's text comes back verbatim.

use crate::error::StatementError;
use crate::llm::{ChatModel, Prompt};
use crate::prompts::{chat_user_prompt, CHAT_SYSTEM_PROMPT};
use crate::store::Job;
use tracing::debug;

/// Placeholder context for a job with no CSV.
pub const NO_DATA: &str = "No transaction data available.";

/// First `max_chars` characters of `s`.
fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Answer `message` from the job's CSV. Model-call failures propagate.
pub async fn get_reply(
    model: &dyn ChatModel,
    job: &Job,
    message: &str,
    context_chars: usize,
) -> Result<String, StatementError> {
    let csv = if job.csv_content.is_empty() {
        NO_DATA
    } else {
        truncate_chars(&job.csv_content, context_chars)
    };
    debug!(
        "Chat: {} of {} CSV chars in context",
        csv.len(),
        job.csv_content.len()
    );

    let prompt = Prompt::new(CHAT_SYSTEM_PROMPT, chat_user_prompt(csv, message));
    model.complete(&prompt).await
}
