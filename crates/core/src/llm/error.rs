use crate::error::ConfigError;
use crate::llm::Provider;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Call(#[from] ModelCallError),
}

/// A failed model invocation, with enough context to diagnose it from logs.
#[derive(Debug, Clone, Error)]
#[error("LLM error (provider={provider}, stage={stage}): {detail}")]
pub struct ModelCallError {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
}

impl ModelCallError {
    pub fn new(provider: Provider, stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            provider,
            stage,
            detail: detail.into(),
            raw_output: None,
        }
    }

    pub fn with_raw_output(mut self, raw_output: String) -> Self {
        self.raw_output = Some(raw_output);
        self
    }
}
