//! LLM Dispatcher (C4) — resolves a model string to a concrete [`ProviderAdapter`].
//!
//! Centralizes what would otherwise be per-provider `new_with_model_*` constructors called
//! explicitly by application code into a single prefix-based lookup, so an agent only needs a
//! model string and an optional API key to get a working adapter.

use crate::error::ConnectOnionError;
use crate::provider::ProviderAdapter;
use crate::providers::{claude::ClaudeAdapter, gemini::GeminiAdapter, managed::ManagedAdapter, openai::OpenAIAdapter};
use std::sync::Arc;

/// Environment variable names the dispatcher reads provider credentials from.
pub mod env_keys {
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
    pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
    pub const OPENONION_API_KEY: &str = "OPENONION_API_KEY";

    /// Which credential variable a model string's prefix resolves to, mirroring
    /// [`super::resolve_adapter`]'s own prefix convention. Used by the Config Loader (C12) to
    /// look up `api_key` once `model` is known.
    pub fn credential_for_model(model: &str) -> Option<&'static str> {
        if model.starts_with("co/") {
            Some(OPENONION_API_KEY)
        } else if model.starts_with("claude-") {
            Some(ANTHROPIC_API_KEY)
        } else if model.starts_with("gemini-") {
            Some(GEMINI_API_KEY)
        } else if model.is_empty() {
            None
        } else {
            Some(OPENAI_API_KEY)
        }
    }
}

/// Resolve a model selector string to a concrete adapter.
///
/// Prefix convention: `co/` → managed adapter; `claude-*` → Anthropic adapter; `gemini-*` →
/// Gemini adapter; everything else → OpenAI adapter. `api_key`, when `Some`, overrides the
/// environment-variable lookup for the selected provider (constructor-argument precedence over
/// the environment).
pub fn resolve_adapter(
    model: &str,
    api_key: Option<&str>,
) -> Result<Arc<dyn ProviderAdapter>, ConnectOnionError> {
    if model.is_empty() {
        return Err(ConnectOnionError::UnknownModel { model: model.to_string() });
    }

    if let Some(rest) = model.strip_prefix("co/") {
        let key = resolve_key(api_key, env_keys::OPENONION_API_KEY)?;
        return Ok(Arc::new(ManagedAdapter::new(key, rest.to_string())));
    }
    if model.starts_with("claude-") {
        let key = resolve_key(api_key, env_keys::ANTHROPIC_API_KEY)?;
        return Ok(Arc::new(ClaudeAdapter::new(key, model.to_string())));
    }
    if model.starts_with("gemini-") {
        let key = resolve_key(api_key, env_keys::GEMINI_API_KEY)?;
        return Ok(Arc::new(GeminiAdapter::new(key, model.to_string())));
    }
    let key = resolve_key(api_key, env_keys::OPENAI_API_KEY)?;
    Ok(Arc::new(OpenAIAdapter::new(key, model.to_string())))
}

fn resolve_key(explicit: Option<&str>, env_var: &str) -> Result<String, ConnectOnionError> {
    if let Some(key) = explicit {
        return Ok(key.to_string());
    }
    std::env::var(env_var).map_err(|_| ConnectOnionError::InvalidConfig {
        detail: format!("no API key provided and {} is not set", env_var),
    })
}
