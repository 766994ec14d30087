//! A single conversation with the assistant.
//!
//! An [`AssistantSession`] sequences one query at a time against the
//! shared orchestrator and keeps the append-only message history.
//! Invariant: every user message is followed by exactly one assistant
//! message — either the answer with its sources, or one synthetic error
//! message — never both, never neither.
//!
//! Sessions hold no durable state; they are created per conversation
//! and discarded afterward.

use tracing::error;

use crate::models::{AssistantMessage, RagResponse};
use crate::service::RagOrchestrator;

/// Text of the synthetic assistant message appended when a query fails.
const ERROR_REPLY: &str = "I apologize, but I encountered an error while processing your \
request. Please make sure your Gemini API key is set correctly and try again.";

/// Whether a query is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sending,
}

/// One conversation: ordered messages plus the in-flight flag.
pub struct AssistantSession {
    messages: Vec<AssistantMessage>,
    state: SessionState,
}

impl AssistantSession {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn messages(&self) -> &[AssistantMessage] {
        &self.messages
    }

    /// Send one question and append the exchange to the history.
    ///
    /// Blank input is ignored. While a query is in flight the session is
    /// `Sending` and the input surface must stay disabled; `&mut self`
    /// makes overlapping sends unrepresentable, and the state is exposed
    /// so callers can reflect it.
    ///
    /// Returns the assistant message that was appended, if any.
    pub async fn send(
        &mut self,
        orchestrator: &RagOrchestrator,
        question: &str,
    ) -> Option<&AssistantMessage> {
        let question = question.trim();
        if question.is_empty() {
            return None;
        }

        self.messages.push(AssistantMessage::user(question));
        self.state = SessionState::Sending;

        let reply = match orchestrator.query(question).await {
            Ok(RagResponse { answer, sources }) => AssistantMessage::assistant(answer, sources),
            Err(e) => {
                // Provider failures propagate verbatim to here; the
                // session converts them into the single user-facing
                // error message.
                error!(error = %e, "query failed");
                AssistantMessage::assistant(ERROR_REPLY, Vec::new())
            }
        };

        self.messages.push(reply);
        self.state = SessionState::Idle;
        self.messages.last()
    }
}

impl Default for AssistantSession {
    fn default() -> Self {
        Self::new()
    }
}
