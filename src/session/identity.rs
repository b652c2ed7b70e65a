//! Per-conversation session id persistence.
//!
//! [`SessionIdentity`] maps a conversation id to its durable session id via
//! the local key-value store, under `chatflow-session-{conversation_id}`.
//! If storage fails, the generated id still exists for the lifetime of the
//! in-memory session; it just will not survive a reload. Storage failures
//! are therefore logged and swallowed, never surfaced.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::store::KvStore;

use super::types::SessionId;

/// Prefix for session id keys in the key-value store.
const KEY_PREFIX: &str = "chatflow-session-";

/// Generate a fresh session id.
///
/// Format: `sess_{unix_millis}_{uuid-v4-simple}`. The timestamp keeps ids
/// roughly sortable; the uuid makes collisions impossible in practice.
pub fn generate_session_id() -> SessionId {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("sess_{now}_{}", Uuid::new_v4().simple())
}

/// Durable session id store keyed by conversation id.
#[derive(Clone)]
pub struct SessionIdentity {
    store: Arc<dyn KvStore>,
}

impl std::fmt::Debug for SessionIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIdentity").finish_non_exhaustive()
    }
}

impl SessionIdentity {
    /// Create an identity store over the given key-value backend.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Return the stored session id for `conversation_id`, minting and
    /// persisting a fresh one if none exists.
    ///
    /// Never fails: if the store is unavailable the freshly generated id is
    /// returned unpersisted and a warning is logged.
    pub async fn get_or_create(&self, conversation_id: &str) -> SessionId {
        let key = Self::key(conversation_id);
        match self.store.get(&key).await {
            Ok(Some(id)) => return id,
            Ok(None) => {}
            Err(e) => {
                warn!(conversation_id, error = %e, "session id read failed; using ephemeral id");
            }
        }

        let id = generate_session_id();
        if let Err(e) = self.store.set(&key, &id).await {
            warn!(conversation_id, error = %e, "session id write failed; id will not survive reload");
        }
        id
    }

    /// Overwrite the stored session id for `conversation_id`.
    ///
    /// Used on recovery, when the backend rejected the previous id. The
    /// in-memory id stays authoritative even if persistence fails.
    pub async fn replace(&self, conversation_id: &str, new_id: &str) {
        let key = Self::key(conversation_id);
        if let Err(e) = self.store.set(&key, new_id).await {
            warn!(conversation_id, error = %e, "session id replace failed; id will not survive reload");
        }
    }

    /// Forget the stored session id for `conversation_id`.
    pub async fn discard(&self, conversation_id: &str) {
        let key = Self::key(conversation_id);
        if let Err(e) = self.store.remove(&key).await {
            warn!(conversation_id, error = %e, "session id discard failed");
        }
    }

    fn key(conversation_id: &str) -> String {
        format!("{KEY_PREFIX}{conversation_id}")
    }
}
