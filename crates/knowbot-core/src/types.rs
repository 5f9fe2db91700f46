//! Core domain types for Knowbot.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for documents.
pub type DocumentId = String;

/// Generate a new unique ID.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Lifecycle status of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    #[default]
    Scanning,
    Active,
    Error,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Scanning => "SCANNING",
            DocumentStatus::Active => "ACTIVE",
            DocumentStatus::Error => "ERROR",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SCANNING" => Some(DocumentStatus::Scanning),
            "ACTIVE" => Some(DocumentStatus::Active),
            "ERROR" => Some(DocumentStatus::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An uploaded document in the knowledge core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    pub mime_type: String,
    pub content: String,
    pub uploaded_at: DateTime<Utc>,
    pub status: DocumentStatus,
}

impl Document {
    /// Create a freshly uploaded document, still being scanned.
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            mime_type: mime_type.into(),
            content: content.into(),
            uploaded_at: Utc::now(),
            status: DocumentStatus::Scanning,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == DocumentStatus::Active
    }

    /// Short form of the id for display and prefix lookups.
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.id.len());
        &self.id[..end]
    }
}

/// Persona the bot answers with.
///
/// No validation is applied: any string, including an empty one, is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub name: String,
    pub organization_name: String,
    pub industry: String,
    pub custom_instructions: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "CORE_UNIT_01".to_string(),
            organization_name: "ACME CORP".to_string(),
            industry: "Technology".to_string(),
            custom_instructions: "Be precise, use technical jargon where appropriate, and always conclude with \"End of Transmission\".".to_string(),
        }
    }
}

impl BotConfig {
    /// Field names accepted by [`BotConfig::set_field`].
    pub const FIELDS: [&'static str; 4] =
        ["name", "organization_name", "industry", "custom_instructions"];

    /// Set a single field by name.
    pub fn set_field(&mut self, field: &str, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        match field {
            "name" => self.name = value,
            "organization_name" | "organization" | "org" => self.organization_name = value,
            "industry" => self.industry = value,
            "custom_instructions" | "instructions" | "tone" => self.custom_instructions = value,
            _ => {
                return Err(Error::InvalidInput(format!(
                    "unknown bot field '{}' (expected one of: {})",
                    field,
                    Self::FIELDS.join(", ")
                )))
            }
        }
        Ok(())
    }
}

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Append-only sequence of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return a reference to it.
    pub fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop every message. Only a full session reset does this.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Export the transcript as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.messages)?)
    }
}
