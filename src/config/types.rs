//! Configuration schema types.
//!
//! [`TurnConfig`] is what actually travels with each chat turn; the other
//! types mirror the three layered sources the resolver draws from and the
//! settings API payloads.

use serde::{Deserialize, Serialize};

/// Default sampling temperature when no layer supplies one.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default generation budget when no layer supplies one.
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Resolved model and memory settings sent with one chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnConfig {
    /// Provider name (e.g. `"openai"`).
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature (UI-bounded).
    pub temperature: f32,
    /// Generation budget in tokens (UI-bounded).
    pub max_tokens: u32,
    /// Optional system prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Conversation memory strategy, sent as-is (never layered).
    pub memory: MemoryConfig,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            model: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: None,
            memory: MemoryConfig::default(),
        }
    }
}

impl TurnConfig {
    /// Combine resolved LLM settings with a memory strategy.
    pub fn from_parts(settings: LlmSettings, memory: MemoryConfig) -> Self {
        Self {
            provider: settings.provider,
            model: settings.model,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            system_prompt: settings.system_prompt,
            memory,
        }
    }
}

/// Conversation memory strategy with strategy-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum MemoryConfig {
    /// Keep the last `window_size` messages verbatim.
    Buffer {
        /// Number of messages retained.
        window_size: u32,
    },
    /// Summarize older turns once thresholds are crossed.
    Summary {
        /// Message count that triggers summarization.
        threshold: u32,
        /// Re-summarize every this many new messages.
        interval: u32,
    },
    /// Retrieve the `top_k` most relevant prior messages.
    Vector {
        /// Number of retrieved messages.
        top_k: u32,
    },
    /// Blend buffer, summary, and vector recall.
    Hybrid {
        /// Weight of the verbatim buffer. Weights conceptually sum to 1.0.
        buffer_weight: f32,
        /// Weight of the running summary.
        summary_weight: f32,
        /// Weight of vector recall.
        vector_weight: f32,
        /// Upper bound on assembled context tokens.
        max_context: u32,
    },
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self::Buffer { window_size: 10 }
    }
}

/// The pieces of LLM configuration that are layered per turn.
///
/// Provider and model are mandatory; the resolver refuses to produce
/// settings without them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Provider name.
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Generation budget in tokens.
    pub max_tokens: u32,
    /// Optional system prompt.
    pub system_prompt: Option<String>,
}

/// A per-conversation saved LLM configuration (highest-priority layer).
///
/// Only consulted when `success` is true: a failed save attempt must not
/// shadow working defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedLlmConfig {
    /// Saved provider, if any.
    pub provider: Option<String>,
    /// Saved model, if any.
    pub model: Option<String>,
    /// Saved temperature, if any.
    pub temperature: Option<f32>,
    /// Saved token budget, if any.
    pub max_tokens: Option<u32>,
    /// Saved system prompt, if any.
    pub system_prompt: Option<String>,
    /// Whether this configuration was saved and validated successfully.
    #[serde(default)]
    pub success: bool,
}

/// A flow's own declared defaults (middle layer).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowDefaults {
    /// Default provider declared by the flow.
    pub provider: Option<String>,
    /// Default model declared by the flow.
    pub model: Option<String>,
    /// Default temperature declared by the flow.
    pub temperature: Option<f32>,
    /// Default token budget declared by the flow.
    pub max_tokens: Option<u32>,
    /// Default system prompt declared by the flow.
    pub system_prompt: Option<String>,
}

/// The global default configuration from the settings API (lowest layer).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalLlmConfig {
    /// Globally configured default provider.
    pub provider: Option<String>,
    /// Globally configured default model.
    pub model: Option<String>,
    /// All providers the backend knows about.
    #[serde(default)]
    pub providers: Vec<ProviderInfo>,
}

/// One provider as described by the settings API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider name (stable identifier).
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Models offered by this provider.
    #[serde(default)]
    pub models: Vec<String>,
    /// Whether the provider is currently usable.
    #[serde(default)]
    pub is_available: bool,
    /// Whether the provider needs an API key before use.
    #[serde(default)]
    pub requires_api_key: bool,
}
