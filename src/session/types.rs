//! The in-memory session: an id plus an append-only message list.
//!
//! # Examples
//!
//! ```
//! use flowchat::session::Session;
//!
//! let mut session = Session::new("sess_001");
//! session.push_user("Hello");
//! let idx = session.begin_assistant();
//! assert!(idx.is_ok());
//! ```

use crate::error::FlowChatError;
use crate::message::{ChatMessage, Role};

/// Unique session identifier (opaque, generated client-side).
pub type SessionId = String;

/// One conversation's message list, bound to a session id.
///
/// Order is append-only and reflects turn order. At most one assistant
/// message is streaming at any time; [`begin_assistant`](Session::begin_assistant)
/// enforces this.
#[derive(Debug, Clone)]
pub struct Session {
    /// The session identifier the backend knows this conversation by.
    pub id: SessionId,
    /// Ordered message list. Never reordered.
    pub messages: Vec<ChatMessage>,
}

impl Session {
    /// Create an empty session with the given id.
    pub fn new(id: impl Into<SessionId>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
        }
    }

    /// Create a session seeded with a greeting from the assistant.
    pub fn with_seed(id: impl Into<SessionId>, seed: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: vec![ChatMessage::assistant(seed)],
        }
    }

    /// Append a user message.
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::user(text));
    }

    /// Append a completed message reconstructed from history.
    pub fn push_history(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Append an empty streaming assistant placeholder.
    ///
    /// Returns the index of the new placeholder.
    ///
    /// # Errors
    ///
    /// Returns [`FlowChatError::TurnInProgress`] if another assistant message
    /// is still streaming: two live placeholders would break the
    /// one-streaming-message invariant.
    pub fn begin_assistant(&mut self) -> Result<usize, FlowChatError> {
        if self.streaming_index().is_some() {
            return Err(FlowChatError::TurnInProgress(
                "an assistant message is already streaming".into(),
            ));
        }
        self.messages.push(ChatMessage::assistant_placeholder());
        Ok(self.messages.len() - 1)
    }

    /// Index of the currently streaming assistant message, if any.
    pub fn streaming_index(&self) -> Option<usize> {
        self.messages
            .iter()
            .position(|m| m.role == Role::Assistant && m.streaming)
    }

    /// Drop all messages and reseed with a single assistant greeting.
    ///
    /// Used by the clear action; the session id is kept.
    pub fn reset(&mut self, seed: impl Into<String>) {
        self.messages.clear();
        self.messages.push(ChatMessage::assistant(seed));
    }

    /// Replace the session id (recovery after a benign session miss).
    pub fn replace_id(&mut self, new_id: impl Into<SessionId>) {
        self.id = new_id.into();
    }
}
