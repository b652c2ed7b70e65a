//! Transports for one chat turn.
//!
//! Two ways to get an assistant reply out of the flow backend:
//!
//! - [`streaming`]: a server-push (SSE) connection emitting typed
//!   [`StreamEvent`](crate::events::StreamEvent)s as the reply is generated.
//! - [`unary`]: a single request/response call returning the full reply.
//!
//! The turn controller prefers streaming and falls back to unary when the
//! stream fails or times out before producing any content.

pub mod sse;
pub mod streaming;
pub mod unary;

use serde::{Deserialize, Serialize};

use crate::config::TurnConfig;

/// Everything the backend needs for one chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    /// The user's message text.
    pub message: String,
    /// Session id binding this turn to server-side memory.
    pub session_id: String,
    /// The workflow being chatted with.
    pub workflow_id: String,
    /// Resolved model and memory settings for this turn.
    pub config: TurnConfig,
}

pub use streaming::StreamingTransport;
pub use unary::UnaryTransport;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TurnConfig;

    #[test]
    fn turn_request_serializes_expected_fields() {
        let request = TurnRequest {
            message: "Hello".into(),
            session_id: "sess_1".into(),
            workflow_id: "wf_1".into(),
            config: TurnConfig::default(),
        };
        let json = serde_json::to_value(&request).unwrap_or_default();
        assert_eq!(json["message"], "Hello");
        assert_eq!(json["session_id"], "sess_1");
        assert_eq!(json["workflow_id"], "wf_1");
        assert!(json["config"].is_object());
    }
}
