//! Session Store (C6) and the `Session`/`TraceEntry` data model for one agent run.
//!
//! Keeps the token-accounting approach familiar from other conversation-history trackers
//! (running message list, running token count, the one-token-per-four-characters estimate from
//! [`crate::message::estimate_message_tokens`]) but adds the `trace`, `start_time`,
//! `iterations_used`, and `final_content` fields a full per-turn record needs beyond plain
//! message/token tracking.

use crate::message::{estimate_message_tokens, Message};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One structured record of an LLM call or a tool execution, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEntry {
    /// One `complete()` round.
    LlmCall {
        iteration: u32,
        duration_ms: u64,
        /// Content hash of the request's message sequence, for debugging/caching consumers.
        request_messages_hash: String,
        response_content: Option<String>,
        response_tool_calls: Vec<crate::message::ToolCall>,
        token_usage: Option<crate::provider::TokenUsage>,
        status: TraceStatus,
        error: Option<String>,
    },
    /// One tool invocation.
    ToolExecution {
        iteration: u32,
        tool_name: String,
        arguments: Value,
        result: Option<String>,
        duration_ms: u64,
        status: TraceStatus,
        error: Option<String>,
    },
}

/// `status` field shared by both [`TraceEntry`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    Success,
    Error,
    NotFound,
}

impl TraceEntry {
    /// The serializable `TokenUsage`-equivalent payload isn't serde-derived on
    /// [`crate::provider::TokenUsage`] by default elsewhere, so this constructor fills it in from
    /// the provider's optional report.
    pub fn llm_call(
        iteration: u32,
        duration_ms: u64,
        request_messages_hash: String,
        response_content: Option<String>,
        response_tool_calls: Vec<crate::message::ToolCall>,
        token_usage: Option<crate::provider::TokenUsage>,
        status: TraceStatus,
        error: Option<String>,
    ) -> Self {
        TraceEntry::LlmCall {
            iteration,
            duration_ms,
            request_messages_hash,
            response_content,
            response_tool_calls,
            token_usage,
            status,
            error,
        }
    }
}

/// The mutable, single-writer record of one `agent.input(...)` call.
///
/// Created at the start of each public `input(...)` call, mutated only by the Agent Loop and
/// event hooks, frozen at `task_complete`, then either discarded or persisted by the History
/// Writer.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_prompt: String,
    pub messages: Vec<Message>,
    pub trace: Vec<TraceEntry>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub iterations_used: u32,
    pub final_content: Option<String>,
    pub agent_name: String,

    max_tokens: usize,
    token_count: usize,
}

impl Session {
    /// Start a new session for `agent_name`, seeding `messages` with an optional system prompt
    /// and the initial user message.
    pub fn new(agent_name: impl Into<String>, system_prompt: Option<&str>, user_prompt: impl Into<String>, max_tokens: usize, now: DateTime<Utc>) -> Self {
        let user_prompt = user_prompt.into();
        let mut messages = Vec::new();
        let mut token_count = 0;
        if let Some(system) = system_prompt {
            let msg = Message::system(system.to_string());
            token_count += estimate_message_tokens(&msg);
            messages.push(msg);
        }
        let user_msg = Message::user(user_prompt.clone());
        token_count += estimate_message_tokens(&user_msg);
        messages.push(user_msg);

        Self {
            user_prompt,
            messages,
            trace: Vec::new(),
            start_time: now,
            end_time: None,
            iterations_used: 0,
            final_content: None,
            agent_name: agent_name.into(),
            max_tokens,
            token_count,
        }
    }

    /// Append a message and update the running token estimate.
    pub fn push_message(&mut self, message: Message) {
        self.token_count += estimate_message_tokens(&message);
        self.messages.push(message);
        self.trim_to_token_budget();
    }

    /// Append a trace entry. Trace entries are never trimmed — only `messages` is, since the
    /// trace is the durable record of what happened, not the live LLM-facing context.
    pub fn push_trace(&mut self, entry: TraceEntry) {
        self.trace.push(entry);
    }

    /// Current estimated token count across `messages`, used by context-window-exhaustion logic.
    pub fn estimated_history_tokens(&self) -> usize {
        self.token_count
    }

    pub fn get_max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Drop the oldest non-system messages until the estimated token count fits `max_tokens`,
    /// skipping over the (at most one) leading system message rather than evicting it.
    ///
    /// Eviction happens in correlated units: an [`Message::AssistantToolCalls`] message is never
    /// removed on its own, since doing so would strand its [`Message::Tool`] results without the
    /// `tool_calls` message they answer. The unit starting at the eviction point is always removed
    /// whole, so the `Message::Tool` correlation invariant holds after trimming the same way it
    /// does before.
    fn trim_conversation_history(&mut self) {
        while self.token_count > self.max_tokens && self.messages.len() > 1 {
            let remove_at = if matches!(self.messages.first(), Some(Message::System { .. })) { 1 } else { 0 };
            if remove_at >= self.messages.len() {
                break;
            }
            let unit_len = self.correlated_unit_len(remove_at);
            let end = (remove_at + unit_len).min(self.messages.len());
            for removed in self.messages.drain(remove_at..end) {
                self.token_count = self.token_count.saturating_sub(estimate_message_tokens(&removed));
            }
        }
    }

    /// Number of messages starting at `start` that must be evicted together: an
    /// [`Message::AssistantToolCalls`] plus every [`Message::Tool`] message immediately following
    /// it (its results), or just `1` for any other message.
    fn correlated_unit_len(&self, start: usize) -> usize {
        if !matches!(self.messages.get(start), Some(Message::AssistantToolCalls { .. })) {
            return 1;
        }
        let mut len = 1;
        while matches!(self.messages.get(start + len), Some(Message::Tool { .. })) {
            len += 1;
        }
        len
    }

    fn trim_to_token_budget(&mut self) {
        if self.max_tokens > 0 {
            self.trim_conversation_history();
        }
    }

    /// Freeze the session at `task_complete`: sets `final_content` and `end_time`.
    pub fn finish(&mut self, final_content: impl Into<String>, now: DateTime<Utc>) {
        self.final_content = Some(final_content.into());
        self.end_time = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn new_session_seeds_system_and_user_messages() {
        let session = Session::new("agent", Some("be helpful"), "hi", 10_000, now());
        assert_eq!(session.messages.len(), 2);
        assert!(matches!(session.messages[0], Message::System { .. }));
        assert!(matches!(session.messages[1], Message::User { .. }));
    }

    #[test]
    fn new_session_without_system_prompt_has_only_user_message() {
        let session = Session::new("agent", None, "hi", 10_000, now());
        assert_eq!(session.messages.len(), 1);
    }

    #[test]
    fn trims_oldest_messages_past_token_budget_but_keeps_system() {
        let mut session = Session::new("agent", Some("sys"), "first", 5, now());
        for i in 0..20 {
            session.push_message(Message::user(format!("message number {}", i)));
        }
        assert!(matches!(session.messages.first(), Some(Message::System { .. })));
        assert!(session.estimated_history_tokens() <= session.get_max_tokens() || session.messages.len() == 2);
    }

    #[test]
    fn trimming_never_strands_a_tool_message_without_its_assistant_toolcalls() {
        let mut session = Session::new("agent", Some("sys"), "first", 30, now());
        for i in 0..15 {
            session.push_message(Message::assistant_tool_calls(vec![crate::message::ToolCall {
                call_id: format!("call-{}", i),
                name: "lookup".to_string(),
                arguments: serde_json::json!({"i": i}),
            }]));
            session.push_message(Message::tool_result(format!("call-{}", i), "lookup", format!("result {}", i)));
        }

        for (idx, message) in session.messages.iter().enumerate() {
            if let Message::Tool { call_id, .. } = message {
                let preceding = session.messages[..idx]
                    .iter()
                    .rev()
                    .find_map(|m| match m {
                        Message::AssistantToolCalls { tool_calls } => Some(tool_calls),
                        _ => None,
                    });
                let preceding = preceding.unwrap_or_else(|| panic!("tool message {} has no preceding assistant-toolcalls message", call_id));
                assert!(
                    preceding.iter().any(|c| &c.call_id == call_id),
                    "tool message {} not answered by its immediately preceding assistant-toolcalls message",
                    call_id
                );
            }
        }
    }

    #[test]
    fn finish_sets_final_content_and_end_time() {
        let mut session = Session::new("agent", None, "hi", 10_000, now());
        session.finish("42", now());
        assert_eq!(session.final_content.as_deref(), Some("42"));
        assert!(session.end_time.is_some());
    }
}
