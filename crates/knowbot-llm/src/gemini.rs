//! Gemini `generateContent` client.

use crate::error::{LlmError, LlmResult};
use crate::generator::{Generation, GenerationRequest, TextGenerator};
use crate::types::*;
use async_trait::async_trait;
use knowbot_config::LlmConfig;
use knowbot_core::Role;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Client for Google's Gemini generative language API.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a client, reading the API key from the configured variable.
    pub fn from_config(config: &LlmConfig) -> LlmResult<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey {
                env: config.api_key_env.clone(),
            })?;

        Self::new(
            &config.gemini_base_url,
            &config.gemini_model,
            api_key,
            config.timeout_seconds,
        )
    }

    pub fn new(
        base_url: &str,
        model: &str,
        api_key: impl Into<String>,
        timeout_seconds: u64,
    ) -> LlmResult<Self> {
        let timeout = Duration::from_secs(timeout_seconds);

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.into(),
            timeout,
        })
    }

    /// Translate a generation request into Gemini's content format.
    pub fn content_request(&self, request: &GenerationRequest) -> GeminiRequest {
        let contents = request
            .turns
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    Role::User => "user",
                    Role::Model => "model",
                };
                GeminiContent::text(Some(role), &turn.text)
            })
            .collect();

        GeminiRequest {
            contents,
            system_instruction: Some(GeminiContent::text(None, &request.system_instruction)),
            generation_config: Some(GeminiGenerationConfig {
                temperature: Some(request.temperature),
            }),
        }
    }

    /// Call `generateContent` once.
    pub async fn generate_content(&self, request: &GeminiRequest) -> LlmResult<GeminiResponse> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        debug!("Generating with Gemini model {}", self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::from_send(e, &self.base_url, self.timeout.as_secs()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);

            if status.as_u16() == 404 {
                return Err(LlmError::ModelNotFound {
                    model: self.model.clone(),
                });
            }

            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> LlmResult<Generation> {
        let response = self.generate_content(&self.content_request(request)).await?;
        Ok(Generation {
            text: response.text(),
            model: response.model_version.or_else(|| Some(self.model.clone())),
        })
    }

    fn describe(&self) -> String {
        format!("gemini/{}", self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowbot_core::Message;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> GenerationRequest {
        GenerationRequest {
            system_instruction: "DESIGNATION: CORE_UNIT_01".to_string(),
            turns: vec![Message::user("Hi"), Message::model("Hello."), Message::user("Refunds?")],
            temperature: 0.1,
        }
    }

    #[test]
    fn test_content_request_mapping() {
        let client = GeminiClient::new("https://example.test/", "gemini-2.0-flash", "k", 30).unwrap();
        let body = client.content_request(&request());

        assert_eq!(body.contents.len(), 3);
        assert_eq!(body.contents[1].role.as_deref(), Some("model"));
        assert_eq!(
            body.system_instruction.unwrap().parts[0].text.as_deref(),
            Some("DESIGNATION: CORE_UNIT_01")
        );
        assert!(!format!("{:?}", client).contains("\"k\""));
    }

    #[tokio::test]
    async fn test_generate_with_mock_server() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
            .and(header("x-goog-api-key", "secret"))
            .and(body_partial_json(serde_json::json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "Hi" }] },
                    { "role": "model", "parts": [{ "text": "Hello." }] },
                    { "role": "user", "parts": [{ "text": "Refunds?" }] }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "Hello" }] },
                    "finishReason": "STOP"
                }],
                "modelVersion": "gemini-2.0-flash-001"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new(&server.uri(), "gemini-2.0-flash", "secret", 30).unwrap();
        let generation = client.generate(&request()).await.unwrap();

        assert_eq!(generation.text.as_deref(), Some("Hello"));
        assert_eq!(generation.model.as_deref(), Some("gemini-2.0-flash-001"));
    }

    #[tokio::test]
    async fn test_throttling_maps_to_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "code": 429, "message": "Resource exhausted", "status": "RESOURCE_EXHAUSTED" }
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&server.uri(), "gemini-2.0-flash", "secret", 30).unwrap();
        let err = client.generate(&request()).await.unwrap_err();
        assert!(
            matches!(err, LlmError::ApiError { status: 429, ref message } if message == "Resource exhausted")
        );
    }
}
