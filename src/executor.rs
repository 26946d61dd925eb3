//! Tool Executor (C8) — dispatches one LLM turn's `ToolCall`s against the agent's tool set.
//!
//! The order of appended `tool` messages must match the order of the incoming `tool_calls`,
//! regardless of which one finishes first. This module satisfies that by pre-allocating an
//! index-keyed result slot per call and running invocations through `tokio::task::JoinSet`
//! before committing anything to the session in canonical order.

use crate::agent::Agent;
use crate::error::ToolFailure;
use crate::event::EventName;
use crate::message::{Message, ToolCall};
use crate::session::{TraceEntry, TraceStatus};
use crate::tool::ToolRecord;
use std::time::{Duration, Instant};

/// Tunable knobs for tool dispatch.
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Per-tool timeout. Default 120s.
    pub tool_timeout: Duration,
    /// Truncation cap for a tool's coerced string result. Default 30,000 characters.
    pub result_char_limit: usize,
    /// When `true`, tool calls within one turn run one at a time instead of concurrently.
    /// Defaults to `false`: parallel by default via a `JoinSet`, with this flag to opt out.
    pub sequential_tools: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            tool_timeout: Duration::from_secs(120),
            result_char_limit: 30_000,
            sequential_tools: false,
        }
    }
}

const TRUNCATION_MARKER: &str = "...[truncated]";

fn truncate(content: String, limit: usize) -> String {
    if content.chars().count() <= limit {
        return content;
    }
    let keep = limit.saturating_sub(TRUNCATION_MARKER.len());
    let mut truncated: String = content.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Outcome of invoking a single tool call, independent of how it is later reported.
enum Outcome {
    Ok(String),
    Failed(ToolFailure, TraceStatus),
}

async fn invoke_one(tool: Option<ToolRecord>, call: &ToolCall, timeout: Duration) -> Outcome {
    let tool = match tool {
        Some(t) => t,
        None => return Outcome::Failed(ToolFailure::NotFound { name: call.name.clone() }, TraceStatus::NotFound),
    };
    let args = match call.arguments.as_object() {
        Some(_) => call.arguments.clone(),
        None => {
            return Outcome::Failed(
                ToolFailure::ArgumentDecode { detail: "arguments is not a JSON object".to_string() },
                TraceStatus::Error,
            )
        }
    };
    let started = Instant::now();
    match tokio::time::timeout(timeout, (tool.invoker)(args)).await {
        Ok(Ok(content)) => Outcome::Ok(content),
        Ok(Err(failure)) => Outcome::Failed(failure, TraceStatus::Error),
        Err(_) => Outcome::Failed(
            ToolFailure::Timeout { elapsed_ms: started.elapsed().as_millis() as u64 },
            TraceStatus::Error,
        ),
    }
}

/// Run every `ToolCall` from one LLM turn against `agent`'s tool set, appending a `tool` message
/// and a `tool_execution` trace entry per call, in canonical (`tool_calls`-array) order.
///
/// `before_tool` fires for each call before that call's invocation starts, not after the whole
/// batch has run: on the sequential path this means literally immediately before `invoke_one`;
/// on the concurrent path it means immediately before that call's task is spawned onto the
/// `JoinSet`, in canonical order, so every `before_tool` firing still precedes its call's actual
/// execution even though calls then run concurrently. `after_tool` fires once a call's result is
/// committed to the session, in canonical order regardless of completion order.
pub async fn execute_tool_calls(agent: &mut Agent, tool_calls: &[ToolCall], iteration: u32) {
    let options = agent.executor_options().clone();
    let tools: Vec<Option<ToolRecord>> = tool_calls.iter().map(|c| agent.find_tool(&c.name)).collect();

    let outcomes: Vec<(Outcome, Duration)> = if options.sequential_tools {
        let mut out = Vec::with_capacity(tool_calls.len());
        for (call, tool) in tool_calls.iter().zip(tools.into_iter()) {
            agent.fire(EventName::BeforeTool);
            let started = Instant::now();
            let outcome = invoke_one(tool, call, options.tool_timeout).await;
            out.push((outcome, started.elapsed()));
        }
        out
    } else {
        let mut set = tokio::task::JoinSet::new();
        for (idx, (call, tool)) in tool_calls.iter().cloned().zip(tools.into_iter()).enumerate() {
            agent.fire(EventName::BeforeTool);
            let timeout = options.tool_timeout;
            set.spawn(async move {
                let started = Instant::now();
                let outcome = invoke_one(tool, &call, timeout).await;
                (idx, outcome, started.elapsed())
            });
        }
        let mut slots: Vec<Option<(Outcome, Duration)>> = (0..tool_calls.len()).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            if let Ok((idx, outcome, elapsed)) = joined {
                slots[idx] = Some((outcome, elapsed));
            }
        }
        slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| {
                (Outcome::Failed(ToolFailure::Runtime { detail: "tool task panicked".to_string() }, TraceStatus::Error), Duration::ZERO)
            }))
            .collect()
    };

    for (call, (outcome, elapsed)) in tool_calls.iter().zip(outcomes.into_iter()) {
        let (content, status, error) = match outcome {
            Outcome::Ok(raw) => (truncate(raw, options.result_char_limit), TraceStatus::Success, None),
            Outcome::Failed(failure, status) => (failure.to_string(), status, Some(failure.to_string())),
        };

        let message = Message::tool_result(call.call_id.clone(), call.name.clone(), content.clone());
        let trace = TraceEntry::ToolExecution {
            iteration,
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
            result: Some(content),
            duration_ms: elapsed.as_millis() as u64,
            status,
            error,
        };

        let session = agent.session_mut();
        session.push_message(message);
        session.push_trace(trace);

        agent.fire(EventName::AfterTool);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use crate::tool::ToolBuilder;

    fn echo_tool() -> ToolRecord {
        ToolBuilder::new("echo", "Echo input back")
            .param_required("text", schema::string())
            .build(|args| {
                Box::pin(async move { Ok(args["text"].as_str().unwrap_or_default().to_string()) })
            })
    }

    fn failing_tool() -> ToolRecord {
        ToolBuilder::new("boom", "Always fails")
            .build(|_| Box::pin(async move { Err(ToolFailure::Runtime { detail: "kaboom".to_string() }) }))
    }

    #[tokio::test]
    async fn missing_tool_reports_not_found_and_continues() {
        let mut agent = Agent::test_instance();
        let calls = vec![ToolCall { call_id: "c1".into(), name: "missing".into(), arguments: serde_json::json!({}) }];
        execute_tool_calls(&mut agent, &calls, 1).await;
        let session = agent.session_mut();
        assert!(matches!(session.trace.last(), Some(TraceEntry::ToolExecution { status: TraceStatus::NotFound, .. })));
    }

    #[tokio::test]
    async fn order_preserved_regardless_of_concurrent_completion() {
        let mut agent = Agent::test_instance();
        agent.add_tool(echo_tool()).unwrap();
        agent.add_tool(failing_tool()).unwrap();
        let calls = vec![
            ToolCall { call_id: "c1".into(), name: "echo".into(), arguments: serde_json::json!({"text": "first"}) },
            ToolCall { call_id: "c2".into(), name: "boom".into(), arguments: serde_json::json!({}) },
            ToolCall { call_id: "c3".into(), name: "echo".into(), arguments: serde_json::json!({"text": "third"}) },
        ];
        execute_tool_calls(&mut agent, &calls, 1).await;
        let session = agent.session_mut();
        let tool_messages: Vec<&Message> = session.messages.iter().filter(|m| matches!(m, Message::Tool { .. })).collect();
        assert_eq!(tool_messages.len(), 3);
        assert_eq!(tool_messages[0].text(), "first");
        assert_eq!(tool_messages[2].text(), "third");
    }

    #[tokio::test]
    async fn result_is_truncated_past_the_char_limit() {
        let mut agent = Agent::test_instance();
        agent.executor_options_mut().result_char_limit = 10;
        agent.add_tool(echo_tool()).unwrap();
        let calls = vec![ToolCall { call_id: "c1".into(), name: "echo".into(), arguments: serde_json::json!({"text": "0123456789abcdef"}) }];
        execute_tool_calls(&mut agent, &calls, 1).await;
        let session = agent.session_mut();
        assert!(session.messages.last().unwrap().text().ends_with("...[truncated]"));
    }
}
