//! Managed-gateway provider adapter, selected by the `co/` model-string prefix.
//!
//! The managed-credentials proxy itself is an external collaborator, out of scope here; this
//! adapter models only its interface point — a chat-completions-shaped endpoint authenticated
//! with `OPENONION_API_KEY` — using the same transport as the other adapters
//! ([`crate::providers::common::complete_via_chat_completions`]): a "managed" adapter that
//! proxies to any of the above through a remote gateway.

use crate::message::Message;
use crate::provider::{CallOptions, CompleteResponse, ProviderAdapter, ToolDefinition, TokenUsage};
use crate::providers::common::{complete_via_chat_completions, get_shared_http_client, with_retries};
use async_trait::async_trait;
use std::error::Error;
use tokio::sync::Mutex;

/// Default managed-gateway base URL.
pub const DEFAULT_BASE_URL: &str = "https://oo.openonion.ai/v1";

/// Adapter for the `co/`-prefixed managed gateway.
pub struct ManagedAdapter {
    api_key: String,
    model: String,
    base_url: String,
    token_usage: Mutex<Option<TokenUsage>>,
}

impl ManagedAdapter {
    /// Construct a client against the default managed gateway. `model` should have its `co/`
    /// prefix stripped by the dispatcher before reaching this constructor.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new_with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    /// Construct a client against a custom managed-gateway base URL.
    pub fn new_with_base_url(api_key: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
            token_usage: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ProviderAdapter for ManagedAdapter {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &CallOptions,
    ) -> Result<CompleteResponse, Box<dyn Error + Send + Sync>> {
        with_retries(|| {
            complete_via_chat_completions(
                &self.base_url,
                &self.api_key,
                &self.model,
                messages,
                tools,
                options,
                get_shared_http_client(),
                &self.token_usage,
            )
        })
        .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        Some(&self.token_usage)
    }
}
