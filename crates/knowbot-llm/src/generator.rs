//! The single operation every generation backend provides.

use crate::client::OllamaClient;
use crate::error::LlmResult;
use crate::gemini::GeminiClient;
use async_trait::async_trait;
use knowbot_config::{LlmConfig, LlmProvider};
use knowbot_core::Message;
use tracing::debug;

/// Everything a backend needs to produce one reply.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Out-of-band system instruction.
    pub system_instruction: String,
    /// Prior turns followed by the new user utterance.
    pub turns: Vec<Message>,
    pub temperature: f32,
}

/// What a backend returned.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Generation {
    /// Reply text; `None` when the backend sent no text field.
    pub text: Option<String>,
    /// Model that served the request, when reported.
    pub model: Option<String>,
}

impl Generation {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            model: None,
        }
    }
}

/// A text-generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce one reply. Called exactly once per user turn.
    async fn generate(&self, request: &GenerationRequest) -> LlmResult<Generation>;

    /// Human-readable backend name for status output.
    fn describe(&self) -> String;
}

/// Build the backend selected in configuration.
pub fn build_generator(config: &LlmConfig) -> LlmResult<Box<dyn TextGenerator>> {
    debug!("Building {} generator", config.provider);
    match config.provider {
        LlmProvider::Ollama => Ok(Box::new(OllamaClient::from_config(config)?)),
        LlmProvider::Gemini => Ok(Box::new(GeminiClient::from_config(config)?)),
    }
}
