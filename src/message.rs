//! The canonical, provider-neutral message sequence.
//!
//! A single struct whose meaning shifts with a `role` field invites runtime variant dispatch;
//! [`Message`] is a tagged union instead, with exhaustive matching over five explicit variants
//! covering the `role`-plus-`tool_calls` shapes a chat-style conversation needs.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A single model-initiated request to invoke a tool, identified by a provider-issued `call_id`.
///
/// Ephemeral — it only ever lives inside an [`Message::AssistantToolCalls`] variant or as the
/// return value of a [`crate::provider::ProviderAdapter::complete`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Opaque identifier, unique within one model turn. Providers that omit one get a
    /// synthesized `uuid` v4 string — see [`crate::provider::synthesize_call_id`].
    pub call_id: String,
    /// Name of the tool the model wants invoked.
    pub name: String,
    /// Decoded JSON argument mapping for the call.
    pub arguments: serde_json::Value,
}

/// The canonical message sequence shared by every provider adapter and the agent loop.
///
/// Invariants (enforced by [`crate::session::Session`] and the agent loop, not by the type
/// itself): at most one [`Message::System`] and it is first; every [`Message::Tool`]'s `call_id`
/// matches a `call_id` in the immediately preceding [`Message::AssistantToolCalls`]; tool messages
/// for one assistant turn appear in the same order as that turn's `tool_calls`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    /// `{role: "system", content: string}` — at most one, always first.
    System { content: Arc<str> },
    /// `{role: "user", content: string}`.
    User { content: Arc<str> },
    /// `{role: "assistant", content: string}` — a terminal natural-language reply.
    AssistantText { content: Arc<str> },
    /// `{role: "assistant", content: "", tool_calls: [ToolCall...]}`.
    AssistantToolCalls { tool_calls: Vec<ToolCall> },
    /// `{role: "tool", call_id, name, content: string}`.
    Tool {
        call_id: String,
        name: String,
        content: Arc<str>,
    },
}

impl Message {
    /// Build a `system` message.
    pub fn system(content: impl Into<Arc<str>>) -> Self {
        Message::System { content: content.into() }
    }

    /// Build a `user` message.
    pub fn user(content: impl Into<Arc<str>>) -> Self {
        Message::User { content: content.into() }
    }

    /// Build an `assistant-text` message.
    pub fn assistant_text(content: impl Into<Arc<str>>) -> Self {
        Message::AssistantText { content: content.into() }
    }

    /// Build an `assistant-toolcalls` message.
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Message::AssistantToolCalls { tool_calls }
    }

    /// Build a `tool` result message.
    pub fn tool_result(call_id: impl Into<String>, name: impl Into<String>, content: impl Into<Arc<str>>) -> Self {
        Message::Tool {
            call_id: call_id.into(),
            name: name.into(),
            content: content.into(),
        }
    }

    /// Best-effort textual content of the message, used for token estimation and trace hashing.
    /// Tool-call-only assistant turns have no textual content and return an empty string.
    pub fn text(&self) -> &str {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::AssistantText { content }
            | Message::Tool { content, .. } => content,
            Message::AssistantToolCalls { .. } => "",
        }
    }

    /// `true` for [`Message::AssistantToolCalls`].
    pub fn is_tool_calls(&self) -> bool {
        matches!(self, Message::AssistantToolCalls { .. })
    }
}

/// Estimate the number of tokens in a string.
///
/// A cheap approximation: one token per four characters, floored at one. Good enough to drive
/// trimming/compaction decisions; not a tokenizer.
pub fn estimate_tokens(text: &str) -> usize {
    (text.len() / 4).max(1)
}

/// Estimate the number of tokens a [`Message`] contributes to a conversation, including a small
/// fixed overhead for the role annotation itself.
pub fn estimate_message_tokens(message: &Message) -> usize {
    const ROLE_OVERHEAD: usize = 1;
    let content_tokens = match message {
        Message::AssistantToolCalls { tool_calls } => {
            let serialized = serde_json::to_string(tool_calls).unwrap_or_default();
            estimate_tokens(&serialized)
        }
        _ => estimate_tokens(message.text()),
    };
    ROLE_OVERHEAD + content_tokens
}
