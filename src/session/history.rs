//! Session history loading with silent recovery.
//!
//! History is a convenience, not a requirement for chatting: every failure
//! path here ends with a usable (possibly empty) message list and no
//! user-visible error.
//!
//! - Success with messages: the ordered history, rebuilt from wire records.
//! - Success with no messages: empty list (normal for a new session).
//! - Session not found or malformed id: the stored identifier is stale.
//!   The session gets a freshly minted id, the new id is persisted, and an
//!   empty list is returned.
//! - Any other failure: logged at warn and swallowed; empty list.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::FlowChatError;
use crate::message::{ChatMessage, Role};

use super::identity::{SessionIdentity, generate_session_id};
use super::types::Session;

/// One prior message as the backend returns it.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct HistoryRecord {
    /// Author role.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// When the message was originally created.
    pub timestamp: DateTime<Utc>,
}

/// Source of prior messages for a session id.
///
/// Implemented by the backend client; test doubles implement it directly.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetch all prior messages for `session_id`, oldest first.
    async fn fetch_history(&self, session_id: &str) -> Result<Vec<HistoryRecord>, FlowChatError>;
}

/// Load prior messages for the session, recovering from stale ids.
///
/// On a benign session miss (not found / invalid id) the session's id is
/// replaced with a fresh one, persisted via `identity`, and an empty list
/// is returned. Other failures are logged and swallowed. The returned
/// messages are not yet appended to the session; the caller decides where
/// they go relative to any seed message.
pub async fn load_history(
    source: &dyn HistorySource,
    identity: &SessionIdentity,
    conversation_id: &str,
    session: &mut Session,
) -> Vec<ChatMessage> {
    match source.fetch_history(&session.id).await {
        Ok(records) => records
            .into_iter()
            .map(|r| ChatMessage::from_history(r.role, r.content, r.timestamp))
            .collect(),
        Err(e) if e.is_benign_session_miss() => {
            let fresh = generate_session_id();
            info!(
                conversation_id,
                stale = session.id.as_str(),
                fresh = fresh.as_str(),
                "stale session id; minting a fresh one"
            );
            identity.replace(conversation_id, &fresh).await;
            session.replace_id(fresh);
            Vec::new()
        }
        Err(e) => {
            warn!(conversation_id, error = %e, "history load failed; continuing without history");
            Vec::new()
        }
    }
}
