//! # Live Chat Ticket Extraction
//!
//! A guarded conversation whose only purpose is to collect enough detail to
//! file a ticket. The assistant is told never to answer questions, and
//! replies that look like answers are replaced with a nudge.
//!
//! Sessions live in an explicit `SessionStore` handed to `LiveChat` at
//! construction. A session is created on its first turn and removed when the
//! user finishes. Each session sits behind its own async mutex, so turns for
//! one session never interleave while different sessions proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use rig::{completion::CompletionModel, embeddings::EmbeddingModel, message::Message};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::error::SupportError;
use super::strip_json_fence;
use crate::model::Client;

pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are a helpdesk ticket extraction assistant. \
    You DO NOT answer general questions or provide information. \
    Your ONLY job is to ask clarifying questions to gather enough info to create a ticket. \
    If the user types 'done', you acknowledge and prepare a ticket summary. \
    Always keep responses short and focused on understanding the issue.";

pub const TICKET_EXTRACTION_PROMPT: &str = "You are an AI assistant that only extracts ticket info. \
    Based on the conversation so far, output JSON only:\n\
    {\n  \"subject\": \"Concise subject of the issue\",\n  \"body\": \"Detailed description of the issue\"\n}\n\
    Do NOT answer any questions from the conversation, only summarize into a ticket.";

/// Reply phrases that indicate the assistant started answering
pub const GUARDRAIL_PHRASES: [&str; 4] = ["i can tell you", "here's how", "you should", "the answer is"];

pub const GUARDRAIL_REPLY: &str = "Please continue describing your issue. I cannot answer questions.";

const CHAT_TEMPERATURE: f64 = 0.5;
const EXTRACTION_TEMPERATURE: f64 = 0.2;

/// Inputs that end a conversation, compared case-insensitively
const EXIT_COMMANDS: [&str; 3] = ["done", "exit", "quit"];

pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim().to_lowercase();
    EXIT_COMMANDS.contains(&input.as_str())
}

/// Replace replies that try to answer the user's question
pub fn apply_guardrail(reply: &str) -> String {
    let lowered = reply.to_lowercase();
    if GUARDRAIL_PHRASES.iter().any(|phrase| lowered.contains(phrase)) {
        GUARDRAIL_REPLY.to_string()
    } else {
        reply.to_string()
    }
}

/// Ticket fields distilled from a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedTicket {
    pub subject: String,
    pub body: String,
}

/// Result of one chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChatTurn {
    InProgress { reply: String },
    Completed { ticket: ExtractedTicket },
}

/// Conversation so far for one session
#[derive(Debug, Default)]
pub struct ChatSession {
    history: Vec<Message>,
}

impl ChatSession {
    pub fn turns(&self) -> usize {
        self.history.len()
    }
}

/// Live-chat sessions keyed by session id
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, Arc<Mutex<ChatSession>>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a session, creating it on first use
    pub async fn get_or_create(&self, session_id: &str) -> Arc<Mutex<ChatSession>> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!(session_id, "creating chat session");
                Arc::new(Mutex::new(ChatSession::default()))
            })
            .clone()
    }

    pub async fn get(&self, session_id: &str) -> Option<Arc<Mutex<ChatSession>>> {
        self.sessions.lock().await.get(session_id).cloned()
    }

    /// Whether `session_id` still maps to this exact session
    pub async fn holds(&self, session_id: &str, session: &Arc<Mutex<ChatSession>>) -> bool {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .is_some_and(|current| Arc::ptr_eq(current, session))
    }

    /// Delete a session; returns false if it did not exist
    pub async fn remove(&self, session_id: &str) -> bool {
        self.sessions.lock().await.remove(session_id).is_some()
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.lock().await.contains_key(session_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Drives live-chat conversations against the language-model oracle
#[derive(Clone)]
pub struct LiveChat<C, E>
where
    C: CompletionModel,
    E: EmbeddingModel,
{
    client: Client<C, E>,
    sessions: SessionStore,
}

impl<C, E> LiveChat<C, E>
where
    C: CompletionModel + 'static,
    E: EmbeddingModel,
{
    pub fn new(client: Client<C, E>, sessions: SessionStore) -> Self {
        Self { client, sessions }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handle one user message.
    ///
    /// An exit command extracts the ticket and removes the session, whether
    /// or not extraction succeeds. Any other input is sent to the oracle and
    /// both turns are recorded.
    #[instrument(skip(self, input), fields(input_len = input.len()))]
    pub async fn turn(&self, session_id: &str, input: &str) -> Result<ChatTurn, SupportError> {
        let handle = self.sessions.get_or_create(session_id).await;
        let mut session = handle.lock().await;

        // The session may have been finished while this turn waited for the lock
        if !self.sessions.holds(session_id, &handle).await {
            return Err(SupportError::UnknownSession(session_id.to_string()));
        }

        if is_exit_command(input) {
            session.history.push(Message::user(input));
            let extracted = self.extract_ticket(&session.history).await;
            self.sessions.remove(session_id).await;
            info!(session_id, ok = extracted.is_ok(), "chat session finished");
            return extracted.map(|ticket| ChatTurn::Completed { ticket });
        }

        let reply = self
            .client
            .converse(
                EXTRACTION_SYSTEM_PROMPT,
                session.history.clone(),
                input,
                CHAT_TEMPERATURE,
            )
            .await?;
        let reply = apply_guardrail(reply.trim());

        session.history.push(Message::user(input));
        session.history.push(Message::assistant(&reply));
        Ok(ChatTurn::InProgress { reply })
    }

    /// Extract a ticket from an existing session and remove it
    pub async fn finish(&self, session_id: &str) -> Result<ExtractedTicket, SupportError> {
        let unknown = || SupportError::UnknownSession(session_id.to_string());
        let handle = self.sessions.get(session_id).await.ok_or_else(unknown)?;
        let session = handle.lock().await;
        if !self.sessions.holds(session_id, &handle).await {
            return Err(unknown());
        }
        let extracted = self.extract_ticket(&session.history).await;
        self.sessions.remove(session_id).await;
        extracted
    }

    async fn extract_ticket(&self, history: &[Message]) -> Result<ExtractedTicket, SupportError> {
        let reply = self
            .client
            .converse(
                EXTRACTION_SYSTEM_PROMPT,
                history.to_vec(),
                TICKET_EXTRACTION_PROMPT,
                EXTRACTION_TEMPERATURE,
            )
            .await?;
        serde_json::from_str(strip_json_fence(&reply)).map_err(|e| SupportError::MalformedReply {
            expected: "ticket",
            message: format!("{e}: {reply}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock_model::{MockCompletionModel, MockEmbeddingModel};

    fn chat() -> LiveChat<MockCompletionModel, MockEmbeddingModel> {
        let client = Client::from_models(
            MockCompletionModel::new(),
            MockEmbeddingModel::with_vocabulary(["x"]),
            "mock-embedding",
        );
        LiveChat::new(client, SessionStore::new())
    }

    #[test]
    fn test_exit_commands() {
        assert!(is_exit_command("done"));
        assert!(is_exit_command(" QUIT "));
        assert!(is_exit_command("Exit"));
        assert!(!is_exit_command("I'm done with this bug"));
    }

    #[test]
    fn test_guardrail() {
        assert_eq!(apply_guardrail("Here's how you fix it"), GUARDRAIL_REPLY);
        assert_eq!(apply_guardrail("The answer is 42"), GUARDRAIL_REPLY);
        assert_eq!(
            apply_guardrail("Which connector are you using?"),
            "Which connector are you using?"
        );
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let chat = chat();
        let completion = chat.client.completion();
        completion.queue_text_response("Which warehouse is affected?").await;
        completion.queue_text_response("You should reinstall the agent.").await;
        completion
            .queue_text_response(r#"{"subject": "Snowflake sync fails", "body": "Nightly sync errors since Monday."}"#)
            .await;

        let first = chat.turn("s-1", "Our sync is failing").await.unwrap();
        assert_eq!(
            first,
            ChatTurn::InProgress {
                reply: "Which warehouse is affected?".to_string()
            }
        );
        assert!(chat.sessions().contains("s-1").await);

        let second = chat.turn("s-1", "Snowflake, since Monday").await.unwrap();
        assert_eq!(
            second,
            ChatTurn::InProgress {
                reply: GUARDRAIL_REPLY.to_string()
            }
        );
        let turns = chat.sessions().get("s-1").await.unwrap().lock().await.turns();
        assert_eq!(turns, 4);

        let done = chat.turn("s-1", "done").await.unwrap();
        assert_eq!(
            done,
            ChatTurn::Completed {
                ticket: ExtractedTicket {
                    subject: "Snowflake sync fails".to_string(),
                    body: "Nightly sync errors since Monday.".to_string(),
                }
            }
        );
        assert!(!chat.sessions().contains("s-1").await);
        assert_eq!(completion.call_count(), 3);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let chat = chat();
        chat.client.completion().set_text_response("Tell me more.").await;

        chat.turn("a", "hello").await.unwrap();
        chat.turn("b", "hi").await.unwrap();
        chat.turn("a", "more detail").await.unwrap();

        assert_eq!(chat.sessions().len().await, 2);
        assert_eq!(chat.sessions().get("a").await.unwrap().lock().await.turns(), 4);
        assert_eq!(chat.sessions().get("b").await.unwrap().lock().await.turns(), 2);
    }

    #[tokio::test]
    async fn test_malformed_extraction_still_removes_session() {
        let chat = chat();
        let completion = chat.client.completion();
        completion.queue_text_response("What happened?").await;
        completion.queue_text_response("Subject: broken").await;

        chat.turn("s-2", "it broke").await.unwrap();
        let result = chat.turn("s-2", "exit").await;

        assert!(matches!(
            result,
            Err(SupportError::MalformedReply {
                expected: "ticket",
                ..
            })
        ));
        assert!(chat.sessions().is_empty().await);
    }

    #[tokio::test]
    async fn test_turn_waiting_on_finished_session_is_rejected() {
        let chat = chat();
        let store = chat.sessions().clone();
        let session = store.get_or_create("s-4").await;
        let guard = session.lock().await;

        let (result, _) = tokio::join!(chat.turn("s-4", "one more detail"), async move {
            tokio::task::yield_now().await;
            store.remove("s-4").await;
            drop(guard);
        });

        assert!(matches!(result, Err(SupportError::UnknownSession(_))));
        assert_eq!(session.lock().await.turns(), 0);
        assert!(chat.sessions().is_empty().await);
        assert_eq!(chat.client.completion().call_count(), 0);
    }

    #[tokio::test]
    async fn test_finish_unknown_session() {
        let chat = chat();
        let result = chat.finish("missing").await;
        assert!(matches!(result, Err(SupportError::UnknownSession(_))));
    }

    #[tokio::test]
    async fn test_oracle_failure_leaves_history_untouched() {
        let chat = chat();
        chat.client.completion().set_error("500").await;

        assert!(matches!(
            chat.turn("s-3", "hello").await,
            Err(SupportError::Oracle(_))
        ));
        assert_eq!(chat.sessions().get("s-3").await.unwrap().lock().await.turns(), 0);
    }
}
