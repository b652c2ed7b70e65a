//! The conversation facade.
//!
//! [`ChatController`] is the single object an embedding application holds
//! per open conversation. It owns the backend client, the session (id and
//! message list), the layered configuration sources, and the turn
//! controller; nothing here reaches for ambient globals. Construct one when
//! a conversation view opens, call [`init`](ChatController::init), then
//! [`send`](ChatController::send) per user message; drop it when the view
//! closes.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use flowchat::api::FlowApi;
//! use flowchat::controller::ChatController;
//! use flowchat::store::MemoryKvStore;
//!
//! # async fn demo() -> Result<(), flowchat::error::FlowChatError> {
//! let store = Arc::new(MemoryKvStore::new());
//! let api = FlowApi::new("http://localhost:3000", store.clone())?;
//! let mut chat = ChatController::new(api, store, "flow-42");
//! chat.init().await;
//! let report = chat.send("What can this flow do?").await?;
//! println!("{:?}", report.outcome);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::FlowApi;
use crate::config::{
    FlowDefaults, GlobalLlmConfig, LlmSettings, MemoryConfig, SavedLlmConfig, TurnConfig,
    resolve_llm_settings,
};
use crate::error::FlowChatError;
use crate::message::ChatMessage;
use crate::session::identity::generate_session_id;
use crate::session::{Session, SessionIdentity, load_history};
use crate::store::KvStore;
use crate::turn::{TurnController, TurnReport, TurnState};

/// Default greeting seeded into an empty conversation.
pub const DEFAULT_SEED: &str = "Hi! How can I help you today?";

/// Everything one open conversation needs, in one place.
pub struct ChatController {
    api: FlowApi,
    identity: SessionIdentity,
    conversation_id: String,
    seed: String,
    session: Session,
    turn: TurnController<FlowApi, FlowApi>,
    cancel: CancellationToken,
    memory: MemoryConfig,
    saved: Option<SavedLlmConfig>,
    flow_defaults: Option<FlowDefaults>,
    global: Option<GlobalLlmConfig>,
}

impl ChatController {
    /// Create a controller for one conversation with the default greeting.
    pub fn new(api: FlowApi, store: Arc<dyn KvStore>, conversation_id: impl Into<String>) -> Self {
        Self::with_seed(api, store, conversation_id, DEFAULT_SEED)
    }

    /// Create a controller with a custom greeting message.
    pub fn with_seed(
        api: FlowApi,
        store: Arc<dyn KvStore>,
        conversation_id: impl Into<String>,
        seed: impl Into<String>,
    ) -> Self {
        let seed = seed.into();
        Self {
            turn: TurnController::new(api.clone(), api.clone()),
            api,
            identity: SessionIdentity::new(store),
            conversation_id: conversation_id.into(),
            session: Session::with_seed(generate_session_id(), seed.clone()),
            seed,
            cancel: CancellationToken::new(),
            memory: MemoryConfig::default(),
            saved: None,
            flow_defaults: None,
            global: None,
        }
    }

    /// Initialize the conversation: restore (or persist) the session id,
    /// load the configuration sources, and load prior history.
    ///
    /// Never fails. History and configuration loads are best-effort; a stale
    /// session id is silently replaced and the conversation starts empty.
    ///
    /// A controller is usable before `init` — construction mints a valid
    /// session id — but only `init` attaches the persisted id, history, and
    /// configuration sources.
    pub async fn init(&mut self) {
        let id = self.identity.get_or_create(&self.conversation_id).await;
        self.session = Session::with_seed(id, self.seed.clone());

        self.load_config_sources().await;

        let history = load_history(
            &self.api,
            &self.identity,
            &self.conversation_id,
            &mut self.session,
        )
        .await;
        for message in history {
            self.session.push_history(message);
        }
        info!(
            conversation_id = self.conversation_id.as_str(),
            session_id = self.session.id.as_str(),
            messages = self.session.messages.len(),
            "conversation initialized"
        );
    }

    async fn load_config_sources(&mut self) {
        match self.api.get_chatflow_config(&self.conversation_id).await {
            Ok(saved) => self.saved = Some(saved),
            Err(e) => {
                warn!(error = %e, "saved flow config unavailable");
            }
        }
        match self.api.get_flow(&self.conversation_id).await {
            Ok(flow) => self.flow_defaults = flow.defaults,
            Err(e) => {
                warn!(error = %e, "flow defaults unavailable");
            }
        }
        match self.api.get_configuration().await {
            Ok(global) => self.global = Some(global),
            Err(e) => {
                warn!(error = %e, "global configuration unavailable");
            }
        }
    }

    /// Send one user message and drive the turn to completion.
    ///
    /// # Errors
    ///
    /// - [`FlowChatError::ConfigUnresolved`] when no provider or model can be
    ///   resolved from any layer; the caller should disable sending until
    ///   configuration is fixed. No message is appended in this case.
    /// - [`FlowChatError::TurnInProgress`] when a turn is already active.
    pub async fn send(&mut self, text: &str) -> Result<TurnReport, FlowChatError> {
        let settings = self.resolve_settings()?;
        let config = TurnConfig::from_parts(settings, self.memory.clone());

        // The turn runs under the controller's current token, so a handle
        // cloned via `cancel_token` before this call governs this turn.
        let cancel = self.cancel.clone();
        let result = self
            .turn
            .run_turn(
                &mut self.session,
                &self.conversation_id,
                text,
                config,
                &cancel,
            )
            .await;
        // A fired token must not pre-cancel the next turn.
        if cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
        result
    }

    /// Cancel the active turn, if any. Safe to call at any time.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// A clone of the cancellation token governing the next (or active)
    /// turn. Clone one before spawning `send` to stop that turn from
    /// another task; once a turn ends cancelled, the token is retired and
    /// later turns need a fresh handle.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Clear the conversation: delete server-side messages, then reset the
    /// local list to the seed greeting. The session id is kept, so memory
    /// strategy settings attached to it survive.
    ///
    /// # Errors
    ///
    /// Propagates backend failures other than a benign session miss (an
    /// unknown session has nothing to clear; the local reset still happens).
    pub async fn clear(&mut self) -> Result<(), FlowChatError> {
        match self.api.clear_chat_session(&self.session.id).await {
            Ok(()) => {}
            Err(e) if e.is_benign_session_miss() => {
                info!(session_id = self.session.id.as_str(), "nothing to clear server-side");
            }
            Err(e) => return Err(e),
        }
        self.session.reset(self.seed.clone());
        Ok(())
    }

    /// Set the memory strategy for this conversation and push it to the
    /// backend session.
    ///
    /// The local strategy is updated even if the push fails; it travels with
    /// every subsequent turn regardless.
    ///
    /// # Errors
    ///
    /// Propagates the backend failure so the caller can surface a retry.
    pub async fn set_memory_config(&mut self, memory: MemoryConfig) -> Result<(), FlowChatError> {
        self.memory = memory.clone();
        self.api
            .update_session_memory(&self.session.id, &memory)
            .await
    }

    /// Resolve the LLM settings that the next turn would use.
    ///
    /// UIs call this to decide whether sending should be enabled.
    ///
    /// # Errors
    ///
    /// [`FlowChatError::ConfigUnresolved`] when no layer supplies a provider
    /// or model.
    pub fn resolve_settings(&self) -> Result<LlmSettings, FlowChatError> {
        resolve_llm_settings(
            self.saved.as_ref(),
            self.flow_defaults.as_ref(),
            self.global.as_ref(),
        )
    }

    /// The ordered message list.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.session.messages
    }

    /// The session id the backend knows this conversation by.
    pub fn session_id(&self) -> &str {
        &self.session.id
    }

    /// The current turn state. `Idle` between turns.
    pub fn turn_state(&self) -> TurnState {
        self.turn.state()
    }

    /// The memory strategy currently attached to this conversation.
    pub fn memory_config(&self) -> &MemoryConfig {
        &self.memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKvStore;

    fn controller() -> ChatController {
        let store = Arc::new(MemoryKvStore::new());
        let api = match FlowApi::new("http://127.0.0.1:1", store.clone()) {
            Ok(api) => api,
            Err(_) => unreachable!("client builds"),
        };
        ChatController::new(api, store, "flow-test")
    }

    #[test]
    fn starts_with_seed_greeting() {
        let chat = controller();
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].content, DEFAULT_SEED);
        assert_eq!(chat.turn_state(), TurnState::Idle);
    }

    #[test]
    fn session_id_is_valid_before_init() {
        // A send before init must never post an empty session id.
        let chat = controller();
        assert!(chat.session_id().starts_with("sess_"));
    }

    #[tokio::test]
    async fn send_refuses_when_config_unresolved() {
        // No configuration source loaded at all: provider/model cannot
        // resolve, so send is refused before any message is appended.
        let mut chat = controller();
        let before = chat.messages().len();

        let result = chat.send("hello").await;
        match result {
            Err(e) => assert_eq!(e.code(), "CONFIG_UNRESOLVED"),
            Ok(_) => unreachable!("no config source can resolve"),
        }
        assert_eq!(chat.messages().len(), before);
    }

    #[test]
    fn resolve_settings_reports_unresolved_for_ui_gating() {
        let chat = controller();
        assert!(chat.resolve_settings().is_err());
    }

    #[test]
    fn default_memory_is_buffer() {
        let chat = controller();
        assert_eq!(
            chat.memory_config(),
            &MemoryConfig::Buffer { window_size: 10 }
        );
    }
}
