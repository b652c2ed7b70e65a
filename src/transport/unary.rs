//! Non-streaming fallback transport.
//!
//! A single request/response call returning the full assistant text. The
//! turn controller uses this when the streaming transport fails or times
//! out before any content has arrived.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::FlowChatError;

use super::TurnRequest;

/// Issues one full-reply chat call per turn.
#[async_trait]
pub trait UnaryTransport: Send + Sync {
    /// Send one turn and return the complete assistant text.
    ///
    /// # Errors
    ///
    /// - [`FlowChatError::AuthError`] on HTTP 401: the caller must route the
    ///   user to the login flow instead of treating this as a turn failure.
    /// - [`FlowChatError::RequestError`] on any other failure; the detail is
    ///   for logs, never for end users.
    async fn send_turn(
        &self,
        conversation_id: &str,
        request: &TurnRequest,
    ) -> Result<String, FlowChatError>;
}

/// Wire shape of the non-streaming chat response.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    /// Whether the workflow produced a reply.
    pub success: bool,
    /// The assistant text, present on success.
    #[serde(default)]
    pub response: Option<String>,
    /// Failure description, present when `success` is false.
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatResponse {
    /// Extract the assistant text, mapping unsuccessful payloads to errors.
    pub fn into_text(self) -> Result<String, FlowChatError> {
        if self.success {
            self.response
                .ok_or_else(|| FlowChatError::RequestError("success response without text".into()))
        } else {
            Err(FlowChatError::RequestError(
                self.error.unwrap_or_else(|| "unspecified backend error".into()),
            ))
        }
    }
}
