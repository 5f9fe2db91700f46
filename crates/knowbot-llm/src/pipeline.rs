//! Knowledge-grounded query pipeline.
//!
//! Every chat turn is answered from the ACTIVE documents only: their text is
//! packed into the system instruction together with the bot persona and a
//! fixed set of directives, and the conversation is sent to the generation
//! backend exactly once.

use crate::generator::{GenerationRequest, TextGenerator};
use knowbot_core::{BotConfig, Document, Message};
use tracing::{debug, error};

/// Grounding used when no document is active.
pub const EMPTY_KNOWLEDGE_SENTINEL: &str = "NO_DATA_INGESTED: Knowledge core is currently empty.";

/// Exact reply the model is told to give when the documents do not cover a question.
pub const INSUFFICIENT_DATA_REPLY: &str =
    "INSUFFICIENT_DATA: The requested information is not available in the current knowledge core.";

/// Shown when the backend answered without any text.
pub const NULL_RESPONSE_SENTINEL: &str = "SYSTEM_ERROR: NULL_RESPONSE_RETURNED";

/// Shown when the backend could not be reached or failed.
pub const SERVICE_FAILURE_SENTINEL: &str =
    "SYSTEM_CRITICAL: Unable to access neural engine. Potential API throttling or network instability.";

/// Sampling temperature for every grounded answer.
pub const GROUNDING_TEMPERATURE: f32 = 0.1;

/// Result of one pipeline invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Model text, passed through untouched.
    Reply(String),
    /// The backend answered but sent no text.
    EmptyResponse,
    /// Transport or service failure, with the diagnostic detail.
    ServiceFailure(String),
}

impl QueryOutcome {
    pub fn is_reply(&self) -> bool {
        matches!(self, QueryOutcome::Reply(_))
    }

    /// Text to show the user; failures become their fixed sentinels.
    pub fn into_text(self) -> String {
        match self {
            QueryOutcome::Reply(text) => text,
            QueryOutcome::EmptyResponse => NULL_RESPONSE_SENTINEL.to_string(),
            QueryOutcome::ServiceFailure(_) => SERVICE_FAILURE_SENTINEL.to_string(),
        }
    }
}

impl std::fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryOutcome::Reply(text) => f.write_str(text),
            QueryOutcome::EmptyResponse => f.write_str(NULL_RESPONSE_SENTINEL),
            QueryOutcome::ServiceFailure(_) => f.write_str(SERVICE_FAILURE_SENTINEL),
        }
    }
}

/// Format the grounding content from active documents.
///
/// Documents are labeled with their id and filename and joined with a blank
/// line, in the order given.
pub fn build_grounding(active: &[&Document]) -> String {
    if active.is_empty() {
        return EMPTY_KNOWLEDGE_SENTINEL.to_string();
    }

    active
        .iter()
        .map(|doc| {
            format!(
                "--- SOURCE_ID: {} | FILENAME: {} ---\n{}",
                doc.id, doc.name, doc.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the system instruction for the given persona and grounding.
pub fn build_system_instruction(bot: &BotConfig, grounding: &str) -> String {
    let mut instruction = String::new();

    instruction.push_str(&format!("DESIGNATION: {}\n", bot.name));
    instruction.push_str("PROTOCOL: KNOWLEDGE_RETRIEVAL_AGENT\n");
    instruction.push_str(&format!("ORGANIZATION: {}\n", bot.organization_name));
    instruction.push_str(&format!("INDUSTRY: {}\n\n", bot.industry));

    instruction.push_str("CORE DIRECTIVES:\n");
    instruction.push_str("1. Answer strictly using the provided KNOWLEDGE BASE.\n");
    instruction.push_str(
        "2. ALWAYS cite the source filename at the end of your response if information from a document was used (e.g., \"[Source: policy_v2.pdf]\").\n",
    );
    instruction.push_str("3. If multiple documents were used, list all of their filenames.\n");
    instruction.push_str(&format!(
        "4. If the information is not present in the KNOWLEDGE BASE, respond with exactly: \"{}\" and nothing else. This overrides directive 5.\n",
        INSUFFICIENT_DATA_REPLY
    ));
    instruction.push_str(&format!(
        "5. Maintain the following tone: {}\n\n",
        bot.custom_instructions
    ));

    instruction.push_str("KNOWLEDGE BASE INGESTION:\n");
    instruction.push_str(grounding);
    instruction.push('\n');

    instruction
}

/// Prior turns followed by the new utterance as the final user turn.
pub fn build_turns(history: &[Message], utterance: &str) -> Vec<Message> {
    let mut turns = Vec::with_capacity(history.len() + 1);
    turns.extend_from_slice(history);
    turns.push(Message::user(utterance));
    turns
}

/// Answers chat turns from the active knowledge through a generation backend.
pub struct QueryPipeline {
    generator: Box<dyn TextGenerator>,
}

impl QueryPipeline {
    pub fn new(generator: Box<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub fn describe(&self) -> String {
        self.generator.describe()
    }

    /// Build the request for one turn without calling the backend.
    ///
    /// `active` is the store's active subset, in insertion order.
    pub fn prepare(
        &self,
        bot: &BotConfig,
        history: &[Message],
        active: &[Document],
        utterance: &str,
    ) -> GenerationRequest {
        let active: Vec<&Document> = active.iter().collect();
        debug!("Grounding on {} active documents", active.len());

        let grounding = build_grounding(&active);
        GenerationRequest {
            system_instruction: build_system_instruction(bot, &grounding),
            turns: build_turns(history, utterance),
            temperature: GROUNDING_TEMPERATURE,
        }
    }

    /// Answer one turn. Never fails: every path ends in a [`QueryOutcome`].
    pub async fn query(
        &self,
        bot: &BotConfig,
        history: &[Message],
        active: &[Document],
        utterance: &str,
    ) -> QueryOutcome {
        let request = self.prepare(bot, history, active, utterance);
        self.execute(&request).await
    }

    /// Send a prepared request and normalize the backend's answer.
    pub async fn execute(&self, request: &GenerationRequest) -> QueryOutcome {
        match self.generator.generate(request).await {
            Ok(generation) => match generation.text {
                Some(text) if !text.is_empty() => QueryOutcome::Reply(text),
                _ => QueryOutcome::EmptyResponse,
            },
            Err(e) => {
                error!("Generation failed ({}): {}", self.generator.describe(), e);
                QueryOutcome::ServiceFailure(e.to_string())
            }
        }
    }
}
