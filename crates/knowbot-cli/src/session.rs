//! Interactive session state.
//!
//! A [`Session`] owns everything one user works with: the knowledge base,
//! the bot persona, the conversation and the query pipeline. Commands borrow
//! it instead of reaching for globals.

use knowbot_config::Config;
use knowbot_core::{BotConfig, Conversation, Document, Message, StoreCounts};
use knowbot_ingest::{read_path, IngestError, KnowledgeBase, ScanWindow};
use knowbot_llm::{build_generator, LlmError, QueryOutcome, QueryPipeline, TextGenerator};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Reasons a session operation is refused.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Nothing to send: the message is empty")]
    EmptyUtterance,

    #[error("No document matches '{0}'")]
    DocumentNotFound(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Bot(#[from] knowbot_core::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Summary shown on the status screen.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub bot_name: String,
    pub backend: String,
    pub documents: StoreCounts,
    pub turns: usize,
}

impl SessionStatus {
    /// `READY` once any document is active, `WAITING` before that.
    pub fn readiness(&self) -> &'static str {
        if self.documents.is_ready() {
            "READY"
        } else {
            "WAITING"
        }
    }
}

/// Top-level application state for one user.
pub struct Session {
    knowledge: KnowledgeBase,
    bot: BotConfig,
    conversation: Conversation,
    pipeline: QueryPipeline,
}

impl Session {
    /// Build a session with the backend selected in configuration.
    pub fn from_config(config: &Config) -> SessionResult<Self> {
        let generator = build_generator(&config.llm)?;
        Self::with_generator(config, generator)
    }

    /// Build a session around an explicit generation backend.
    pub fn with_generator(
        config: &Config,
        generator: Box<dyn TextGenerator>,
    ) -> SessionResult<Self> {
        let window = ScanWindow::from_config(&config.scan)?;
        let pipeline = QueryPipeline::new(generator);

        Ok(Self {
            knowledge: KnowledgeBase::new(window),
            bot: config.bot.clone(),
            conversation: Conversation::new(),
            pipeline,
        })
    }

    pub fn bot(&self) -> &BotConfig {
        &self.bot
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn backend(&self) -> String {
        self.pipeline.describe()
    }

    /// Upload raw text as a document.
    pub async fn upload_text(&self, name: &str, mime_type: &str, content: &str) -> Document {
        self.knowledge.upload(name, mime_type, content).await
    }

    /// Upload a file, or every text file in a directory.
    pub async fn upload_path(&self, path: &str) -> SessionResult<Vec<Document>> {
        let files = read_path(path)?;
        let mut uploaded = Vec::with_capacity(files.len());
        for file in files {
            uploaded.push(
                self.knowledge
                    .upload(file.name, file.mime_type, file.content)
                    .await,
            );
        }
        info!("Uploaded {} document(s) from {}", uploaded.len(), path);
        Ok(uploaded)
    }

    /// Remove a document by id or unique id prefix.
    pub async fn remove_document(&self, id_or_prefix: &str) -> SessionResult<Document> {
        let document = self
            .knowledge
            .find(id_or_prefix)
            .await
            .ok_or_else(|| SessionError::DocumentNotFound(id_or_prefix.to_string()))?;

        self.knowledge
            .remove(&document.id)
            .await
            .ok_or_else(|| SessionError::DocumentNotFound(id_or_prefix.to_string()))
    }

    pub async fn documents(&self) -> Vec<Document> {
        self.knowledge.documents().await
    }

    /// Replace the persona wholesale.
    pub fn update_bot(&mut self, bot: BotConfig) {
        self.bot = bot;
    }

    pub fn set_bot_field(&mut self, field: &str, value: &str) -> SessionResult<()> {
        self.bot.set_field(field, value)?;
        Ok(())
    }

    /// Send one utterance and append both turns to the conversation.
    ///
    /// Taking `&mut self` keeps a session to one query in flight.
    pub async fn submit(&mut self, utterance: &str) -> SessionResult<QueryOutcome> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Err(SessionError::EmptyUtterance);
        }

        let active = self.knowledge.active_subset().await;
        let request = self.pipeline.prepare(
            &self.bot,
            self.conversation.messages(),
            &active,
            utterance,
        );
        self.conversation.push(Message::user(utterance));

        let outcome = self.pipeline.execute(&request).await;
        self.conversation.push(Message::model(outcome.to_string()));
        Ok(outcome)
    }

    /// Wait for pending scans, up to `timeout`.
    pub async fn wait_for_scans(&self, timeout: Duration) -> bool {
        self.knowledge.wait_until_settled(timeout).await
    }

    pub async fn status(&self) -> SessionStatus {
        SessionStatus {
            bot_name: self.bot.name.clone(),
            backend: self.backend(),
            documents: self.knowledge.counts().await,
            turns: self.conversation.len(),
        }
    }

    /// Forget the conversation and every document.
    pub async fn reset(&mut self) {
        self.conversation.clear();
        self.knowledge.clear().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use knowbot_core::{DocumentStatus, Role};
    use knowbot_llm::pipeline::{
        EMPTY_KNOWLEDGE_SENTINEL, GROUNDING_TEMPERATURE, NULL_RESPONSE_SENTINEL,
        SERVICE_FAILURE_SENTINEL,
    };
    use knowbot_llm::{Generation, GenerationRequest, LlmResult};
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<GenerationRequest>>>;

    struct ScriptedGenerator {
        replies: Mutex<Vec<LlmResult<Generation>>>,
        seen: Seen,
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, request: &GenerationRequest) -> LlmResult<Generation> {
            self.seen.lock().unwrap().push(request.clone());
            self.replies.lock().unwrap().remove(0)
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    fn scripted_session(replies: Vec<LlmResult<Generation>>) -> (Session, Seen) {
        let seen = Seen::default();
        let generator = ScriptedGenerator {
            replies: Mutex::new(replies),
            seen: Arc::clone(&seen),
        };
        let session = Session::with_generator(&Config::default(), Box::new(generator)).unwrap();
        (session, seen)
    }

    #[tokio::test(start_paused = true)]
    async fn test_refund_policy_scenario() {
        let (mut session, seen) = scripted_session(vec![Ok(Generation::text(
            "Refunds are accepted within 30 days. [Source: policy.txt]",
        ))]);

        let doc = session
            .upload_text("policy.txt", "text/plain", "Refunds within 30 days.")
            .await;
        assert_eq!(doc.status, DocumentStatus::Scanning);
        assert!(session.wait_for_scans(Duration::from_secs(10)).await);

        let outcome = session.submit("What is the refund policy?").await.unwrap();
        assert!(outcome.is_reply());

        let requests = seen.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].system_instruction.contains("policy.txt"));
        assert!(requests[0].system_instruction.contains("Refunds within 30 days."));
        assert_eq!(requests[0].temperature, 0.1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scanning_documents_are_not_grounded() {
        let (mut session, seen) = scripted_session(vec![Ok(Generation::text("ok"))]);
        session
            .upload_text("draft.txt", "text/plain", "Unscanned secret")
            .await;

        session.submit("Anything?").await.unwrap();

        let requests = seen.lock().unwrap();
        assert!(requests[0].system_instruction.contains(EMPTY_KNOWLEDGE_SENTINEL));
        assert!(!requests[0].system_instruction.contains("Unscanned secret"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_scans_are_not_grounded() {
        let (mut session, seen) = scripted_session(vec![Ok(Generation::text("ok"))]);
        session.upload_text("good.txt", "text/plain", "Grounded fact").await;
        let bad = session.upload_text("bad.txt", "text/plain", "Broken secret").await;
        assert!(session.knowledge.mark_error(&bad.id).await);
        assert!(session.wait_for_scans(Duration::from_secs(10)).await);

        session.submit("Anything?").await.unwrap();

        let requests = seen.lock().unwrap();
        assert!(requests[0].system_instruction.contains("Grounded fact"));
        assert!(!requests[0].system_instruction.contains("Broken secret"));
    }

    #[tokio::test]
    async fn test_temperature_stays_fixed_whatever_the_config_says() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[llm]\ntemperature = 1.5\n").unwrap();
        let config = Config::load_from(&path).unwrap();

        let seen = Seen::default();
        let generator = ScriptedGenerator {
            replies: Mutex::new(vec![Ok(Generation::text("ok"))]),
            seen: Arc::clone(&seen),
        };
        let mut session = Session::with_generator(&config, Box::new(generator)).unwrap();
        session.submit("hello").await.unwrap();

        assert_eq!(seen.lock().unwrap()[0].temperature, GROUNDING_TEMPERATURE);
    }

    #[tokio::test]
    async fn test_conversation_order_and_history() {
        let (mut session, seen) = scripted_session(vec![
            Ok(Generation::text("first answer")),
            Ok(Generation::text("second answer")),
        ]);

        session.submit("  first question ").await.unwrap();
        session.submit("second question").await.unwrap();

        let texts: Vec<(Role, &str)> = session
            .conversation()
            .messages()
            .iter()
            .map(|m| (m.role, m.text.as_str()))
            .collect();
        assert_eq!(
            texts,
            vec![
                (Role::User, "first question"),
                (Role::Model, "first answer"),
                (Role::User, "second question"),
                (Role::Model, "second answer"),
            ]
        );

        // The second request carries the first exchange followed by the new turn.
        let requests = seen.lock().unwrap();
        assert_eq!(requests[1].turns.len(), 3);
        assert_eq!(requests[1].turns[0].text, "first question");
        assert_eq!(requests[1].turns[2].text, "second question");
    }

    #[tokio::test]
    async fn test_empty_utterance_is_rejected() {
        let (mut session, seen) = scripted_session(vec![]);
        let result = session.submit("   \n").await;

        assert!(matches!(result, Err(SessionError::EmptyUtterance)));
        assert!(session.conversation().is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_appended_as_model_turns() {
        let (mut session, _) = scripted_session(vec![
            Err(LlmError::Timeout { seconds: 120 }),
            Ok(Generation::default()),
        ]);

        let outcome = session.submit("hello?").await.unwrap();
        assert!(matches!(outcome, QueryOutcome::ServiceFailure(_)));
        assert_eq!(
            session.conversation().last().unwrap().text,
            SERVICE_FAILURE_SENTINEL
        );

        session.submit("retry").await.unwrap();
        let last = session.conversation().last().unwrap();
        assert_eq!(last.role, Role::Model);
        assert_eq!(last.text, NULL_RESPONSE_SENTINEL);
        assert_eq!(session.conversation().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_by_prefix_and_status() {
        let (session, _) = scripted_session(vec![]);
        let doc = session.upload_text("a.txt", "text/plain", "a").await;

        let status = session.status().await;
        assert_eq!(status.readiness(), "WAITING");
        assert_eq!(status.documents.scanning, 1);
        assert_eq!(status.backend, "scripted");

        let removed = session.remove_document(doc.short_id()).await.unwrap();
        assert_eq!(removed.id, doc.id);
        assert!(matches!(
            session.remove_document(doc.short_id()).await,
            Err(SessionError::DocumentNotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bot_updates_and_reset() {
        let (mut session, seen) = scripted_session(vec![Ok(Generation::text("arr"))]);
        session.set_bot_field("name", "PIRATE_BOT").unwrap();
        session.set_bot_field("tone", "Talk like a pirate.").unwrap();
        assert!(session.set_bot_field("mood", "grumpy").is_err());

        session.upload_text("map.txt", "text/plain", "X marks the spot").await;
        session.wait_for_scans(Duration::from_secs(10)).await;
        session.submit("Where is the treasure?").await.unwrap();
        {
            let requests = seen.lock().unwrap();
            assert!(requests[0].system_instruction.contains("DESIGNATION: PIRATE_BOT"));
            assert!(requests[0].system_instruction.contains("Talk like a pirate."));
        }

        session.reset().await;
        assert!(session.conversation().is_empty());
        assert!(session.documents().await.is_empty());

        session.update_bot(BotConfig::default());
        assert_eq!(session.bot().name, "CORE_UNIT_01");
    }

    #[tokio::test]
    async fn test_upload_path_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("faq.md"), "# FAQ").unwrap();

        let (session, _) = scripted_session(vec![]);
        let docs = session
            .upload_path(dir.path().to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "faq.md");
        assert_eq!(docs[0].mime_type, "text/markdown");
        assert!(session.upload_path("/no/such/file.txt").await.is_err());
    }
}
