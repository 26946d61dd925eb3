//! Anthropic Claude provider adapter, routed through the OpenAI-compatible transport.
//!
//! Grounded in `clients/claude.rs`'s `ClaudeClient`, which delegates every call to an
//! `OpenAIClient` pointed at Anthropic's OpenAI-compatible base URL — the same delegation shape
//! is kept here, just against [`crate::providers::openai::OpenAIAdapter`] instead of the vendor
//! `openai_rust2`-backed client.

use crate::message::Message;
use crate::provider::{CallOptions, CompleteResponse, ProviderAdapter, ToolDefinition, TokenUsage};
use crate::providers::openai::OpenAIAdapter;
use async_trait::async_trait;
use std::error::Error;
use tokio::sync::Mutex;

/// Anthropic's OpenAI-compatible Chat Completions base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Client wrapper for Anthropic's Claude API, delegating HTTP concerns to an `OpenAIAdapter`.
pub struct ClaudeAdapter {
    delegate: OpenAIAdapter,
}

impl ClaudeAdapter {
    /// Construct a client against Anthropic's default OpenAI-compatible endpoint.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { delegate: OpenAIAdapter::new_with_base_url(api_key, model, DEFAULT_BASE_URL) }
    }

    /// Construct a client against a custom Claude-compatible base URL.
    pub fn new_with_base_url(api_key: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self { delegate: OpenAIAdapter::new_with_base_url(api_key, model, base_url) }
    }
}

#[async_trait]
impl ProviderAdapter for ClaudeAdapter {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &CallOptions,
    ) -> Result<CompleteResponse, Box<dyn Error + Send + Sync>> {
        self.delegate.complete(messages, tools, options).await
    }

    fn model_name(&self) -> &str {
        self.delegate.model_name()
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        self.delegate.usage_slot()
    }
}
