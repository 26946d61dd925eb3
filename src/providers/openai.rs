//! OpenAI-style provider adapter — the default when a model string matches no other prefix.
//!
//! Grounded in `clients/openai.rs`'s `OpenAIClient` (constructor shapes, usage-slot field,
//! `log::log_enabled!` guarded diagnostics) but routed through
//! [`crate::providers::common::complete_via_chat_completions`] directly, since native
//! `tool_calls` parsing against the chat-completions wire format is what this adapter needs.

use crate::message::Message;
use crate::provider::{CallOptions, CompleteResponse, ProviderAdapter, ToolDefinition, TokenUsage};
use crate::providers::common::{complete_via_chat_completions, get_shared_http_client, with_retries};
use async_trait::async_trait;
use std::error::Error;
use tokio::sync::Mutex;

/// Default OpenAI Chat Completions base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client wrapper for OpenAI's Chat Completions API with native function calling.
pub struct OpenAIAdapter {
    api_key: String,
    model: String,
    base_url: String,
    token_usage: Mutex<Option<TokenUsage>>,
}

impl OpenAIAdapter {
    /// Construct a client against the default OpenAI endpoint.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new_with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    /// Construct a client against a custom OpenAI-compatible base URL (self-hosted gateways,
    /// Azure OpenAI, etc.).
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
impl ProviderAdapter for OpenAIAdapter {
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
