//! Provider Adapters (C3) — the minimal capability surface every LLM backend implements.
//!
//! Keeps the `Send + Sync`, `async_trait`-based adapter shape and the `TokenUsage`/usage-slot
//! idiom familiar from other provider-facing traits, but names the entry point `complete` and
//! has it return a `{content, tool_calls, raw_response}` triple instead of a single
//! provider-shaped [`crate::message::Message`].

use crate::message::{Message, ToolCall};
use async_trait::async_trait;
use std::error::Error;
use tokio::sync::Mutex;

/// A provider-agnostic tool schema sent alongside a `complete()` request.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
}

/// How many tokens were spent on prompt vs. completion.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

/// The `{content, tool_calls, raw_response}` triple a `complete()` call resolves to.
#[derive(Debug, Clone)]
pub struct CompleteResponse {
    /// Terminal natural-language reply, or `None` when the model requested tool calls instead.
    pub content: Option<String>,
    /// Tool calls the model requested, in the order the provider returned them. Empty when the
    /// model produced a terminal reply.
    pub tool_calls: Vec<ToolCall>,
    /// The provider's raw response payload, kept opaque for debugging/telemetry consumers.
    pub raw_response: serde_json::Value,
}

/// A structured-output request for the one-shot helper (C5) and, in principle, for any adapter
/// call that wants a schema-constrained reply instead of tool calls.
#[derive(Debug, Clone)]
pub struct StructuredOutputRequest {
    /// JSON Schema the reply must validate against.
    pub schema: serde_json::Value,
    /// Name surfaced to providers that require a named structured-output schema.
    pub schema_name: String,
}

/// Per-call knobs a dispatcher resolves from configuration before invoking an adapter:
/// temperature, max_completion_tokens, and similar per-provider settings.
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub temperature: f32,
    pub max_completion_tokens: Option<u32>,
    /// Present only for structured-output calls (`one_shot` with an `output_schema`).
    pub structured_output: Option<StructuredOutputRequest>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self { temperature: 0.1, max_completion_tokens: None, structured_output: None }
    }
}

/// Trait implemented by every concrete provider dialect (OpenAI-style, Anthropic-style,
/// Gemini-style, and the managed gateway adapter).
///
/// Implementations translate the canonical [`Message`] sequence into their wire format, translate
/// the response back into a [`CompleteResponse`], and synthesize a `call_id` via
/// [`synthesize_call_id`] for any tool call the provider returns without one.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Run one request/response round.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &CallOptions,
    ) -> Result<CompleteResponse, Box<dyn Error + Send + Sync>>;

    /// The model identifier this adapter was constructed with, e.g. `"gpt-4.1-nano"`.
    fn model_name(&self) -> &str;

    /// Token usage from the most recent `complete()` call, if the provider reports it.
    async fn get_last_usage(&self) -> Option<TokenUsage> {
        if let Some(slot) = self.usage_slot() {
            slot.lock().await.clone()
        } else {
            None
        }
    }

    /// Expose a shared slot where the implementation persists token usage. Adapters that don't
    /// track usage can leave the default `None` in place.
    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        None
    }
}

/// Synthesize a `call_id` for a provider that omits one: when the provider does not emit IDs,
/// the adapter synthesizes one that is unique within the turn.
pub fn synthesize_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}
