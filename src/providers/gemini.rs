//! Google Gemini provider adapter, routed through the OpenAI-compatible transport.
//!
//! Grounded in `clients/gemini.rs`'s `GeminiClient`; image generation and other Gemini-specific
//! extensions in that file are out of this crate's scope (built-in tool/media bodies are not
//! something this adapter owns), so only the chat-completions delegation shape is carried over, the
//! same way [`crate::providers::claude::ClaudeAdapter`] delegates to
//! [`crate::providers::openai::OpenAIAdapter`].

use crate::message::Message;
use crate::provider::{CallOptions, CompleteResponse, ProviderAdapter, ToolDefinition, TokenUsage};
use crate::providers::openai::OpenAIAdapter;
use async_trait::async_trait;
use std::error::Error;
use tokio::sync::Mutex;

/// Gemini's OpenAI-compatible Chat Completions base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Client wrapper for Google's Gemini API, delegating HTTP concerns to an `OpenAIAdapter`.
pub struct GeminiAdapter {
    delegate: OpenAIAdapter,
}

impl GeminiAdapter {
    /// Construct a client against Gemini's default OpenAI-compatible endpoint.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { delegate: OpenAIAdapter::new_with_base_url(api_key, model, DEFAULT_BASE_URL) }
    }

    /// Construct a client against a custom Gemini-compatible base URL.
    pub fn new_with_base_url(api_key: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self { delegate: OpenAIAdapter::new_with_base_url(api_key, model, base_url) }
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
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
