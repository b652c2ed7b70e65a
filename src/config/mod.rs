//! Per-turn model and memory configuration.
//!
//! LLM settings for a turn come from three layered sources, highest
//! priority first: a per-conversation saved configuration (only when marked
//! successful), the flow's own declared defaults, and the global default
//! configuration. [`resolve_llm_settings`] implements that layering as a
//! pure function. Memory configuration is not layered; it is held by the
//! conversation and sent as-is with each turn.

pub mod resolve;
pub mod types;

pub use resolve::resolve_llm_settings;
pub use types::{
    FlowDefaults, GlobalLlmConfig, LlmSettings, MemoryConfig, ProviderInfo, SavedLlmConfig,
    TurnConfig,
};
