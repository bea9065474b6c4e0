//! Conversation types and state management
//!
//! A conversation is a linear, append-only list of turns plus the
//! continuity token (`last_response_id`) of the most recent AI answer. All
//! mutation goes through [`ConversationState::apply`], which returns the
//! side effect the caller must perform.

mod session;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use session::{ChatSession, ChatTransport};

pub const WELCOME_MESSAGE: &str = "Hello! I'm your personal AI assistant. I can help with your \
podcast interviews, business meetings, client details and anything else covered in your \
uploaded transcripts. What would you like to know?";

pub const EMPTY_REPLY_FALLBACK: &str =
    "I'm sorry, I couldn't generate a response. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    pub id: Uuid,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
}

impl ChatTurn {
    fn new(sender: Sender, content: impl Into<String>, response_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            sender,
            timestamp: Utc::now(),
            response_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sending,
    Errored,
}

/// A message ready to go to `/api/chat`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub message: String,
    pub session_id: String,
    pub previous_response_id: Option<String>,
}

/// Successful answer from the chat endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub output: String,
    pub response_id: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    Submit(String),
    Replied(Reply),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    Send(OutgoingMessage),
}

#[derive(Debug, Clone)]
pub struct ConversationState {
    turns: Vec<ChatTurn>,
    session_id: String,
    last_response_id: Option<String>,
    phase: Phase,
    error: Option<String>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            turns: Vec::new(),
            session_id: Uuid::new_v4().to_string(),
            last_response_id: None,
            phase: Phase::Idle,
            error: None,
        }
    }

    /// Start with an AI greeting turn
    pub fn with_welcome(mut self, greeting: &str) -> Self {
        self.turns.push(ChatTurn::new(Sender::Ai, greeting, None));
        self
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn last_response_id(&self) -> Option<&str> {
        self.last_response_id.as_deref()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Sending
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Apply one event and report what the caller has to do next
    pub fn apply(&mut self, event: ConversationEvent) -> Effect {
        match event {
            ConversationEvent::Submit(content) => {
                let content = content.trim();
                if self.is_loading() || content.is_empty() {
                    return Effect::None;
                }

                self.turns.push(ChatTurn::new(Sender::User, content, None));
                self.phase = Phase::Sending;
                self.error = None;

                Effect::Send(OutgoingMessage {
                    message: content.to_string(),
                    session_id: self.session_id.clone(),
                    previous_response_id: self.last_response_id.clone(),
                })
            }
            ConversationEvent::Replied(reply) => {
                if !self.is_loading() {
                    return Effect::None;
                }

                if let Some(session_id) = reply.session_id.filter(|s| !s.is_empty()) {
                    if session_id != self.session_id {
                        tracing::debug!(%session_id, "server assigned a new session id");
                        self.session_id = session_id;
                    }
                }

                let content = if reply.output.trim().is_empty() {
                    EMPTY_REPLY_FALLBACK.to_string()
                } else {
                    reply.output
                };

                self.turns
                    .push(ChatTurn::new(Sender::Ai, content, reply.response_id.clone()));
                self.last_response_id = reply.response_id;
                self.phase = Phase::Idle;
                Effect::None
            }
            ConversationEvent::Failed(message) => {
                if !self.is_loading() {
                    return Effect::None;
                }

                self.turns.push(ChatTurn::new(Sender::Ai, message.clone(), None));
                self.error = Some(message);
                self.phase = Phase::Errored;
                Effect::None
            }
        }
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}
