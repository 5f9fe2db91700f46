//! Error types for generation backends.

use thiserror::Error;

/// Errors that can occur when talking to a generation backend.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Request timeout.
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The requested model is not available.
    #[error("Model not found: {model}")]
    ModelNotFound { model: String },

    /// Backend server is not reachable.
    #[error("Generation server is not reachable at {host}")]
    ServerNotRunning { host: String },

    /// API returned an error response.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// No API key in the configured environment variable.
    #[error("Missing API key: set the {env} environment variable")]
    MissingApiKey { env: String },

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for generation operations.
pub type LlmResult<T> = Result<T, LlmError>;

impl LlmError {
    /// Classify a failed `send()` the same way for every backend.
    pub(crate) fn from_send(err: reqwest::Error, host: &str, timeout_secs: u64) -> Self {
        if err.is_connect() {
            LlmError::ServerNotRunning {
                host: host.to_string(),
            }
        } else if err.is_timeout() {
            LlmError::Timeout {
                seconds: timeout_secs,
            }
        } else {
            LlmError::Http(err)
        }
    }
}
