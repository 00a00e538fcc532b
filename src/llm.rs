//! Language-model seam: the [`ChatModel`] trait and its edgequake-llm adapter.
//!
//! The agent and chat service only need "send a system + user prompt, get
//! text back". Keeping that behind a small object-safe trait lets tests run
//! the whole extraction/categorisation flow against a scripted model, while
//! production wraps any `edgequake_llm::LLMProvider`.

use crate::config::StatementConfig;
use crate::error::StatementError;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Default model when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// A single-turn prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Anything that can answer a [`Prompt`] with raw text.
pub trait ChatModel: Send + Sync {
    /// Send the prompt and return the model's text output verbatim.
    ///
    /// Errors are transport/auth/rate-limit failures already rendered as
    /// [`StatementError::ModelCallFailed`].
    fn complete<'a>(&'a self, prompt: &'a Prompt) -> BoxFuture<'a, Result<String, StatementError>>;
}

/// [`ChatModel`] backed by an edgequake-llm provider.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &StatementConfig) -> Self {
        Self {
            provider,
            options: CompletionOptions {
                temperature: Some(config.temperature),
                max_tokens: Some(config.max_tokens),
                ..Default::default()
            },
        }
    }
}

impl ChatModel for ProviderModel {
    fn complete<'a>(&'a self, prompt: &'a Prompt) -> BoxFuture<'a, Result<String, StatementError>> {
        Box::pin(async move {
            let start = Instant::now();
            let messages = vec![
                ChatMessage::system(prompt.system.as_str()),
                ChatMessage::user(prompt.user.as_str()),
            ];
            let response = self
                .provider
                .chat(&messages, Some(&self.options))
                .await
                .map_err(|e| StatementError::ModelCallFailed(e.to_string()))?;
            debug!(
                "LLM call: {} input tokens, {} output tokens, {:?}",
                response.prompt_tokens,
                response.completion_tokens,
                start.elapsed()
            );
            Ok(response.content)
        })
    }
}

/// Instantiate a named provider with the given model.
fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, StatementError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        StatementError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the provider for text prompts, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`).
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **OpenAI key present** (`OPENAI_API_KEY`) with the configured or default model.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_text_provider(config: &StatementConfig) -> Result<Arc<dyn LLMProvider>, StatementError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| StatementError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

/// Resolve the provider for page images.
///
/// A `vision_model` with no provider name is built on the text provider's
/// backend. Returns `None` when nothing is configured; the vision path is
/// then skipped rather than failing the request.
pub fn resolve_vision_provider(
    config: &StatementConfig,
    text_provider: Option<&Arc<dyn LLMProvider>>,
) -> Option<Arc<dyn LLMProvider>> {
    if let Some(ref provider) = config.vision_provider {
        return Some(Arc::clone(provider));
    }

    let name = config
        .vision_provider_name
        .as_deref()
        .or(config.provider_name.as_deref());
    if let Some(name) = name {
        let model = config
            .vision_model
            .as_deref()
            .or(config.model.as_deref())
            .unwrap_or(DEFAULT_MODEL);
        return match create_provider(name, model) {
            Ok(p) => Some(p),
            Err(e) => {
                debug!("Vision provider unavailable: {}", e);
                None
            }
        };
    }

    let text_provider = text_provider?;
    if let Some(model) = config.vision_model.as_deref() {
        return match create_provider(text_provider.name(), model) {
            Ok(p) => Some(p),
            Err(e) => {
                debug!("Vision model {} unavailable, using the text provider: {}", model, e);
                Some(Arc::clone(text_provider))
            }
        };
    }
    Some(Arc::clone(text_provider))
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgequake_llm::MockProvider;

    #[test]
    fn prompt_new_keeps_both_parts() {
        let p = Prompt::new("sys", String::from("user"));
        assert_eq!(p.system, "sys");
        assert_eq!(p.user, "user");
    }

    #[test]
    fn vision_provider_absent_without_any_configuration() {
        let config = StatementConfig::default();
        assert!(resolve_vision_provider(&config, None).is_none());
    }

    #[test]
    fn vision_falls_back_to_the_text_provider() {
        let text: Arc<dyn LLMProvider> = Arc::new(MockProvider::new());
        let config = StatementConfig::default();
        let vision = resolve_vision_provider(&config, Some(&text)).unwrap();
        assert!(Arc::ptr_eq(&vision, &text));
    }

    #[test]
    fn vision_model_alone_builds_on_the_text_backend() {
        let text: Arc<dyn LLMProvider> = Arc::new(MockProvider::new());
        let config = StatementConfig::builder().vision_model("gpt-4o").build().unwrap();
        let vision = resolve_vision_provider(&config, Some(&text)).unwrap();
        assert!(!Arc::ptr_eq(&vision, &text));
        assert_eq!(vision.name(), "mock");
    }
}
