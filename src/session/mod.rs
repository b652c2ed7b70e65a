//! Session identity, message list, and history recovery.
//!
//! A session ties a conversation (one flow viewed by one user) to the
//! backend's server-side memory. The identifier is generated client-side,
//! persisted in the local key-value store, and silently replaced whenever
//! the backend rejects it as unknown or malformed.

pub mod history;
pub mod identity;
pub mod types;

pub use history::{HistoryRecord, HistorySource, load_history};
pub use identity::SessionIdentity;
pub use types::{Session, SessionId};
