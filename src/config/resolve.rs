//! Pure layered resolution of per-turn LLM settings.
//!
//! Priority, highest first:
//!
//! 1. the per-conversation saved configuration, if present and marked
//!    successful;
//! 2. the flow's own declared defaults;
//! 3. the global default configuration.
//!
//! Resolution is field-wise: each of provider, model, temperature, max
//! tokens, and system prompt is taken from the highest layer that supplies
//! it. Provider and model are mandatory; if no layer supplies one, the
//! resolver fails and the caller must treat sending as disabled rather
//! than guess a default.

use crate::error::FlowChatError;

use super::types::{
    DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, FlowDefaults, GlobalLlmConfig, LlmSettings,
    SavedLlmConfig,
};

/// Resolve the LLM settings for one turn from the three layered sources.
///
/// # Errors
///
/// Returns [`FlowChatError::ConfigUnresolved`] when no layer supplies a
/// provider or a model.
pub fn resolve_llm_settings(
    saved: Option<&SavedLlmConfig>,
    flow: Option<&FlowDefaults>,
    global: Option<&GlobalLlmConfig>,
) -> Result<LlmSettings, FlowChatError> {
    // A saved config only participates when it was saved successfully.
    let saved = saved.filter(|s| s.success);

    let provider = saved
        .and_then(|s| s.provider.clone())
        .or_else(|| flow.and_then(|f| f.provider.clone()))
        .or_else(|| global.and_then(|g| g.provider.clone()))
        .ok_or_else(|| {
            FlowChatError::ConfigUnresolved("no provider available from any layer".into())
        })?;

    let model = saved
        .and_then(|s| s.model.clone())
        .or_else(|| flow.and_then(|f| f.model.clone()))
        .or_else(|| global.and_then(|g| g.model.clone()))
        .ok_or_else(|| {
            FlowChatError::ConfigUnresolved("no model available from any layer".into())
        })?;

    let temperature = saved
        .and_then(|s| s.temperature)
        .or_else(|| flow.and_then(|f| f.temperature))
        .unwrap_or(DEFAULT_TEMPERATURE);

    let max_tokens = saved
        .and_then(|s| s.max_tokens)
        .or_else(|| flow.and_then(|f| f.max_tokens))
        .unwrap_or(DEFAULT_MAX_TOKENS);

    let system_prompt = saved
        .and_then(|s| s.system_prompt.clone())
        .or_else(|| flow.and_then(|f| f.system_prompt.clone()));

    Ok(LlmSettings {
        provider,
        model,
        temperature,
        max_tokens,
        system_prompt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved_success() -> SavedLlmConfig {
        SavedLlmConfig {
            provider: Some("anthropic".into()),
            model: Some("claude-sonnet-4".into()),
            temperature: Some(0.2),
            max_tokens: Some(1024),
            system_prompt: Some("saved prompt".into()),
            success: true,
        }
    }

    fn flow_defaults() -> FlowDefaults {
        FlowDefaults {
            provider: Some("openai".into()),
            model: Some("gpt-4o".into()),
            temperature: Some(0.5),
            max_tokens: Some(4096),
            system_prompt: Some("flow prompt".into()),
        }
    }

    fn global_config() -> GlobalLlmConfig {
        GlobalLlmConfig {
            provider: Some("local".into()),
            model: Some("llama-3".into()),
            providers: Vec::new(),
        }
    }

    #[test]
    fn saved_successful_config_wins_over_everything() {
        let settings = resolve_llm_settings(
            Some(&saved_success()),
            Some(&flow_defaults()),
            Some(&global_config()),
        );
        match settings {
            Ok(s) => {
                assert_eq!(s.provider, "anthropic");
                assert_eq!(s.model, "claude-sonnet-4");
                assert_eq!(s.temperature, 0.2);
                assert_eq!(s.max_tokens, 1024);
                assert_eq!(s.system_prompt.as_deref(), Some("saved prompt"));
            }
            Err(_) => unreachable!("all layers present"),
        }
    }

    #[test]
    fn unsuccessful_saved_config_is_ignored() {
        let mut saved = saved_success();
        saved.success = false;

        let settings =
            resolve_llm_settings(Some(&saved), Some(&flow_defaults()), Some(&global_config()));
        match settings {
            Ok(s) => {
                assert_eq!(s.provider, "openai");
                assert_eq!(s.model, "gpt-4o");
            }
            Err(_) => unreachable!("flow layer resolves"),
        }
    }

    #[test]
    fn flow_defaults_beat_global() {
        let settings = resolve_llm_settings(None, Some(&flow_defaults()), Some(&global_config()));
        match settings {
            Ok(s) => {
                assert_eq!(s.provider, "openai");
                assert_eq!(s.model, "gpt-4o");
                assert_eq!(s.temperature, 0.5);
            }
            Err(_) => unreachable!("flow layer resolves"),
        }
    }

    #[test]
    fn global_is_the_last_resort() {
        let settings = resolve_llm_settings(None, None, Some(&global_config()));
        match settings {
            Ok(s) => {
                assert_eq!(s.provider, "local");
                assert_eq!(s.model, "llama-3");
                assert_eq!(s.temperature, DEFAULT_TEMPERATURE);
                assert_eq!(s.max_tokens, DEFAULT_MAX_TOKENS);
                assert!(s.system_prompt.is_none());
            }
            Err(_) => unreachable!("global layer resolves"),
        }
    }

    #[test]
    fn fields_layer_independently() {
        // Saved supplies only the model; provider comes from flow,
        // temperature from flow, and so on.
        let saved = SavedLlmConfig {
            provider: None,
            model: Some("claude-haiku-4".into()),
            temperature: None,
            max_tokens: None,
            system_prompt: None,
            success: true,
        };
        let settings =
            resolve_llm_settings(Some(&saved), Some(&flow_defaults()), Some(&global_config()));
        match settings {
            Ok(s) => {
                assert_eq!(s.provider, "openai");
                assert_eq!(s.model, "claude-haiku-4");
                assert_eq!(s.temperature, 0.5);
                assert_eq!(s.max_tokens, 4096);
                assert_eq!(s.system_prompt.as_deref(), Some("flow prompt"));
            }
            Err(_) => unreachable!("layers resolve"),
        }
    }

    #[test]
    fn no_provider_anywhere_is_unresolved() {
        let global = GlobalLlmConfig {
            provider: None,
            model: Some("llama-3".into()),
            providers: Vec::new(),
        };
        let result = resolve_llm_settings(None, None, Some(&global));
        match result {
            Err(e) => assert_eq!(e.code(), "CONFIG_UNRESOLVED"),
            Ok(_) => unreachable!("provider missing everywhere"),
        }
    }

    #[test]
    fn no_model_anywhere_is_unresolved() {
        let global = GlobalLlmConfig {
            provider: Some("local".into()),
            model: None,
            providers: Vec::new(),
        };
        let result = resolve_llm_settings(None, None, Some(&global));
        match result {
            Err(e) => assert_eq!(e.code(), "CONFIG_UNRESOLVED"),
            Ok(_) => unreachable!("model missing everywhere"),
        }
    }

    #[test]
    fn no_layers_at_all_is_unresolved() {
        let result = resolve_llm_settings(None, None, None);
        assert!(result.is_err());
    }

    #[test]
    fn resolution_is_deterministic() {
        let saved = saved_success();
        let flow = flow_defaults();
        let global = global_config();
        let a = resolve_llm_settings(Some(&saved), Some(&flow), Some(&global));
        let b = resolve_llm_settings(Some(&saved), Some(&flow), Some(&global));
        match (a, b) {
            (Ok(x), Ok(y)) => assert_eq!(x, y),
            _ => unreachable!("both resolve"),
        }
    }
}
