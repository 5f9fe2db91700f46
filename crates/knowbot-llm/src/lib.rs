//! Knowbot LLM - text generation backends and the query pipeline.
//!
//! This crate provides async clients for Ollama and Gemini behind a single
//! [`TextGenerator`] trait, and the [`QueryPipeline`] that grounds every chat
//! turn in the active documents of the knowledge core.

mod client;
mod error;
mod gemini;
mod generator;
pub mod pipeline;
mod types;

pub use client::OllamaClient;
pub use error::{LlmError, LlmResult};
pub use gemini::GeminiClient;
pub use generator::{build_generator, Generation, GenerationRequest, TextGenerator};
pub use pipeline::{QueryOutcome, QueryPipeline};
pub use types::*;
