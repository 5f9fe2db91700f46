//! Ollama HTTP client.

use crate::error::{LlmError, LlmResult};
use crate::generator::{Generation, GenerationRequest, TextGenerator};
use crate::types::*;
use async_trait::async_trait;
use knowbot_config::LlmConfig;
use knowbot_core::Role;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Client for interacting with Ollama's API.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    host: String,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a new client from configuration.
    pub fn from_config(config: &LlmConfig) -> LlmResult<Self> {
        Self::build(&config.host, &config.model, config.timeout_seconds)
    }

    /// Create a new client with default settings.
    pub fn new(host: impl Into<String>, model: impl Into<String>) -> LlmResult<Self> {
        Self::build(&host.into(), &model.into(), 120)
    }

    fn build(host: &str, model: &str, timeout_seconds: u64) -> LlmResult<Self> {
        let timeout = Duration::from_secs(timeout_seconds);

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
        })
    }

    /// Check if Ollama server is available.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.host);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// List all available models.
    pub async fn list_models(&self) -> LlmResult<Vec<ModelInfo>> {
        let url = format!("{}/api/tags", self.host);
        debug!("Listing models from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LlmError::from_send(e, &self.host, self.timeout.as_secs()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status,
                message: text,
            });
        }

        let list: ListModelsResponse = response.json().await?;
        Ok(list.models)
    }

    /// Check if a specific model is available.
    pub async fn has_model(&self, model: &str) -> LlmResult<bool> {
        let models = self.list_models().await?;
        // Check both exact match and model without tag
        Ok(models
            .iter()
            .any(|m| m.name == model || m.name.starts_with(&format!("{}:", model))))
    }

    /// Send a non-streaming chat request.
    pub async fn chat(&self, request: ChatRequest) -> LlmResult<ChatResponse> {
        let url = format!("{}/api/chat", self.host);
        debug!(
            "Chatting with model {} ({} messages)",
            request.model,
            request.messages.len()
        );

        // Ensure streaming is off for this method
        let mut request = request;
        request.stream = false;

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::from_send(e, &self.host, self.timeout.as_secs()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();

            if text.contains("not found") || status.as_u16() == 404 {
                return Err(LlmError::ModelNotFound {
                    model: request.model,
                });
            }

            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message: text,
            });
        }

        let chat_response: ChatResponse = response.json().await?;
        if let Some(count) = chat_response.eval_count {
            info!("Model {} produced {} tokens", chat_response.model, count);
        }
        Ok(chat_response)
    }

    /// Translate a generation request into Ollama's chat format.
    pub fn chat_request(&self, request: &GenerationRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(request.turns.len() + 1);
        messages.push(ChatMessage::new("system", &request.system_instruction));
        messages.extend(request.turns.iter().map(|turn| {
            let role = match turn.role {
                Role::User => "user",
                Role::Model => "assistant",
            };
            ChatMessage::new(role, &turn.text)
        }));

        ChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
            options: Some(GenerateOptions::new().with_temperature(request.temperature)),
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, request: &GenerationRequest) -> LlmResult<Generation> {
        let response = self.chat(self.chat_request(request)).await?;
        let text = response
            .message
            .map(|m| m.content)
            .filter(|content| !content.is_empty());

        Ok(Generation {
            text,
            model: Some(response.model),
        })
    }

    fn describe(&self) -> String {
        format!("ollama/{} @ {}", self.model, self.host)
    }
}
