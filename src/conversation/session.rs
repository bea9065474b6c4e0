//! Drives a [`ConversationState`] against a chat transport

use std::fmt::Display;

use async_trait::async_trait;

use super::{ChatTurn, ConversationEvent, ConversationState, Effect, OutgoingMessage, Reply};

/// Anything that can deliver one chat turn to the server
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Error text is shown to the user as an AI turn
    type Error: Display + Send;

    async fn send_message(&self, message: &OutgoingMessage) -> Result<Reply, Self::Error>;
}

pub struct ChatSession<T> {
    state: ConversationState,
    transport: T,
}

impl<T: ChatTransport> ChatSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            state: ConversationState::new(),
            transport,
        }
    }

    pub fn with_state(transport: T, state: ConversationState) -> Self {
        Self { state, transport }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Submit one user message and wait for the AI turn.
    ///
    /// Returns `None` when the message was ignored (blank input).
    pub async fn send(&mut self, content: &str) -> Option<&ChatTurn> {
        let outgoing = match self.state.apply(ConversationEvent::Submit(content.to_string())) {
            Effect::Send(outgoing) => outgoing,
            Effect::None => return None,
        };

        let event = match self.transport.send_message(&outgoing).await {
            Ok(reply) => ConversationEvent::Replied(reply),
            Err(e) => {
                tracing::warn!(session_id = %outgoing.session_id, "chat turn failed: {}", e);
                ConversationEvent::Failed(e.to_string())
            }
        };
        self.state.apply(event);

        self.state.turns().last()
    }
}
