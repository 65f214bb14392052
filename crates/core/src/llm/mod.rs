pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod json;
pub mod prompt;

use crate::config::{LlmProviderKind, Settings};
use crate::llm::error::ModelError;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    Gemini,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Anthropic => f.write_str("anthropic"),
            Provider::Gemini => f.write_str("gemini"),
        }
    }
}

/// A generative model. The answer is raw text: callers must not assume it is
/// valid JSON, whatever the prompt asked for.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn generate_text(&self, prompt: &str) -> Result<String, ModelError>;
}

pub fn client_from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn LlmClient>> {
    Ok(match settings.llm_provider()? {
        LlmProviderKind::Gemini => Arc::new(gemini::GeminiClient::from_settings(settings)?),
        LlmProviderKind::Anthropic => {
            Arc::new(anthropic::AnthropicClient::from_settings(settings)?)
        }
    })
}
