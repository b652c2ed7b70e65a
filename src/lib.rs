//! flowchat — streaming chat client for flow orchestration backends.
//!
//! This crate is the conversation engine an application embeds to chat with
//! a deployed agent flow: it keeps the per-conversation session identity,
//! restores history, streams assistant replies over SSE with a
//! non-streaming fallback, and resolves per-turn model configuration from
//! layered sources.
//!
//! # Architecture
//!
//! - [`controller`] — [`ChatController`](controller::ChatController), the
//!   one object to hold per open conversation.
//! - [`turn`] — the per-turn state machine over the two transports.
//! - [`transport`] — SSE decoding, the streaming and unary transport seams.
//! - [`session`] — session identity, message list, history recovery.
//! - [`config`] — layered resolution of per-turn LLM settings.
//! - [`api`] — the HTTP client implementing the transport seams.
//! - [`store`] — durable local key-value storage (session ids, token).
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use flowchat::{ChatController, FlowApi};
//! use flowchat::store::FsKvStore;
//!
//! # async fn demo() -> Result<(), flowchat::FlowChatError> {
//! let store = Arc::new(FsKvStore::default_location()?);
//! let api = FlowApi::new("http://localhost:3000", store.clone())?;
//!
//! let mut chat = ChatController::new(api, store, "flow-42");
//! chat.init().await;
//!
//! let report = chat.send("Summarize our last conversation.").await?;
//! for message in chat.messages() {
//!     println!("{}: {}", message.role, message.content);
//! }
//! # let _ = report;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod message;
pub mod session;
pub mod store;
pub mod transport;
pub mod turn;

pub use api::FlowApi;
pub use controller::ChatController;
pub use error::{FlowChatError, Result};
pub use events::{StreamEvent, StreamEventStream};
pub use message::{ChatMessage, Role};
pub use session::{Session, SessionId};
pub use turn::{TurnNotice, TurnOutcome, TurnReport, TurnState};
