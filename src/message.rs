//! Chat message types.
//!
//! A [`ChatMessage`] is one entry in a conversation's append-only message
//! list. User messages are immutable once created; assistant messages start
//! as empty streaming placeholders and grow as content deltas arrive, then
//! freeze on completion or error.
//!
//! # Examples
//!
//! ```
//! use flowchat::message::{ChatMessage, Role};
//!
//! let user = ChatMessage::user("Hello");
//! assert_eq!(user.role, Role::User);
//! assert!(!user.streaming);
//!
//! let mut reply = ChatMessage::assistant_placeholder();
//! reply.append_delta("Hi");
//! reply.append_delta(" there");
//! reply.finalize();
//! assert_eq!(reply.content, "Hi there");
//! assert!(!reply.streaming);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user.
    User,
    /// The assistant (workflow output).
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in a conversation.
///
/// `content` is mutable only while `streaming` is true; the turn controller
/// appends deltas as they arrive and freezes the message when the turn
/// completes, fails, or is cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Identifier unique within the session.
    pub id: String,
    /// Author role.
    pub role: Role,
    /// Message text. Grows during streaming for assistant messages.
    pub content: String,
    /// When the message was created.
    pub timestamp: DateTime<Utc>,
    /// True while content is still arriving.
    #[serde(default)]
    pub streaming: bool,
}

impl ChatMessage {
    /// Create a user message. Immutable by convention.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: generate_message_id(),
            role: Role::User,
            content: text.into(),
            timestamp: Utc::now(),
            streaming: false,
        }
    }

    /// Create a completed assistant message (e.g. from history or a seed).
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            id: generate_message_id(),
            role: Role::Assistant,
            content: text.into(),
            timestamp: Utc::now(),
            streaming: false,
        }
    }

    /// Create an empty assistant placeholder awaiting streamed content.
    pub fn assistant_placeholder() -> Self {
        Self {
            id: generate_message_id(),
            role: Role::Assistant,
            content: String::new(),
            timestamp: Utc::now(),
            streaming: true,
        }
    }

    /// Rebuild a message from a history wire record.
    pub fn from_history(role: Role, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: generate_message_id(),
            role,
            content: content.into(),
            timestamp,
            streaming: false,
        }
    }

    /// Append a content delta. Ignored once the message is frozen.
    pub fn append_delta(&mut self, delta: &str) {
        if self.streaming {
            self.content.push_str(delta);
        }
    }

    /// Replace the full content (unary fallback path).
    pub fn set_content(&mut self, text: impl Into<String>) {
        self.content = text.into();
    }

    /// Freeze the message: no further content changes via `append_delta`.
    pub fn finalize(&mut self) {
        self.streaming = false;
    }

    /// True if no content has arrived yet.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Generate a message id unique within a session.
///
/// Format: `msg_{uuid-v4-simple}`.
fn generate_message_id() -> String {
    format!("msg_{}", uuid::Uuid::new_v4().simple())
}
