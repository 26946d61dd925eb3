//! End-to-end coverage of the agent loop (C9) against its public surface, using a scripted
//! `ProviderAdapter` injected via `AgentConfig::llm` in place of a real network call — the same
//! mock-the-transport-trait shape the teacher's `tests/agent_tests.rs` uses for `ClientWrapper`.

use async_trait::async_trait;
use connectonion::agent::AgentConfig;
use connectonion::error::ToolFailure;
use connectonion::event::EventName;
use connectonion::message::{Message, ToolCall};
use connectonion::provider::{CallOptions, CompleteResponse, ProviderAdapter, ToolDefinition};
use connectonion::schema;
use connectonion::session::TraceEntry;
use connectonion::tool::ToolBuilder;
use connectonion::Agent;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Replays a fixed sequence of turns, one response per `complete()` call — the "LLM is stubbed"
/// shape spec.md §8's scenarios describe.
struct ScriptedAdapter {
    turns: Mutex<Vec<CompleteResponse>>,
}

impl ScriptedAdapter {
    fn new(turns: Vec<CompleteResponse>) -> Arc<dyn ProviderAdapter> {
        Arc::new(Self { turns: Mutex::new(turns.into_iter().rev().collect()) })
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    async fn complete(
        &self,
        _messages: &[Message],
        _tools: &[ToolDefinition],
        _options: &CallOptions,
    ) -> Result<CompleteResponse, Box<dyn std::error::Error + Send + Sync>> {
        self.turns.lock().unwrap().pop().ok_or_else(|| "scripted adapter exhausted".into())
    }

    fn model_name(&self) -> &str {
        "scripted-test-model"
    }
}

fn text_turn(content: &str) -> CompleteResponse {
    CompleteResponse { content: Some(content.to_string()), tool_calls: vec![], raw_response: serde_json::json!({}) }
}

fn tool_turn(call_id: &str, name: &str, args: serde_json::Value) -> CompleteResponse {
    CompleteResponse {
        content: None,
        tool_calls: vec![ToolCall { call_id: call_id.to_string(), name: name.to_string(), arguments: args }],
        raw_response: serde_json::json!({}),
    }
}

fn multi_tool_turn(calls: &[(&str, &str, serde_json::Value)]) -> CompleteResponse {
    CompleteResponse {
        content: None,
        tool_calls: calls
            .iter()
            .map(|(id, name, args)| ToolCall { call_id: id.to_string(), name: name.to_string(), arguments: args.clone() })
            .collect(),
        raw_response: serde_json::json!({}),
    }
}

fn add_tool() -> connectonion::ToolRecord {
    ToolBuilder::new("add", "Add two integers")
        .param_required("a", schema::integer())
        .param_required("b", schema::integer())
        .build(|args| {
            Box::pin(async move {
                let a = args["a"].as_i64().unwrap_or_default();
                let b = args["b"].as_i64().unwrap_or_default();
                Ok((a + b).to_string())
            })
        })
}

fn weather_tool() -> connectonion::ToolRecord {
    ToolBuilder::new("weather", "Look up the weather for a city")
        .param_required("city", schema::string())
        .build(|args| {
            Box::pin(async move {
                let city = args["city"].as_str().unwrap_or_default().to_string();
                Ok(format!("sunny in {}", city))
            })
        })
}

fn time_tool() -> connectonion::ToolRecord {
    ToolBuilder::new("time", "Look up the current time for a timezone")
        .param_required("tz", schema::string())
        .build(|args| {
            Box::pin(async move {
                let tz = args["tz"].as_str().unwrap_or_default().to_string();
                Ok(format!("noon in {}", tz))
            })
        })
}

fn scratch_config(name: &str) -> AgentConfig {
    AgentConfig::new().name(name).project_root(std::env::temp_dir().join("connectonion-tests").join(name))
}

#[tokio::test]
async fn single_tool_call_scenario() {
    let llm = ScriptedAdapter::new(vec![
        tool_turn("call_1", "add", serde_json::json!({"a": 25, "b": 17})),
        text_turn("42"),
    ]);
    let mut agent = Agent::new(scratch_config("arithmetic").llm(llm).tool(add_tool())).unwrap();

    let reply = agent.input("What is 25 + 17?").await.unwrap();
    assert_eq!(reply, "42");

    let session = agent.last_session().expect("session recorded after input() returns");
    let tool_traces: Vec<_> =
        session.trace.iter().filter(|e| matches!(e, TraceEntry::ToolExecution { .. })).collect();
    assert_eq!(tool_traces.len(), 1);
    assert_eq!(session.iterations_used, 2);
}

#[tokio::test]
async fn parallel_tool_calls_preserve_canonical_message_order() {
    let llm = ScriptedAdapter::new(vec![
        multi_tool_turn(&[
            ("t1", "weather", serde_json::json!({"city": "Tokyo"})),
            ("t2", "time", serde_json::json!({"tz": "JST"})),
        ]),
        text_turn("it's sunny and noon"),
    ]);
    let mut agent =
        Agent::new(scratch_config("dual-tool").llm(llm).tool(weather_tool()).tool(time_tool())).unwrap();

    let reply = agent.input("what's the weather and time?").await.unwrap();
    assert_eq!(reply, "it's sunny and noon");

    let session = agent.last_session().unwrap();
    let tool_messages: Vec<&Message> = session.messages.iter().filter(|m| matches!(m, Message::Tool { .. })).collect();
    assert_eq!(tool_messages.len(), 2);
    assert_eq!(tool_messages[0].text(), "sunny in Tokyo");
    assert_eq!(tool_messages[1].text(), "noon in JST");
}

#[tokio::test]
async fn tool_not_found_is_reported_and_the_next_turn_answers() {
    let llm = ScriptedAdapter::new(vec![
        tool_turn("t1", "delete_universe", serde_json::json!({})),
        text_turn("I can't do that."),
    ]);
    let mut agent = Agent::new(scratch_config("guarded").llm(llm)).unwrap();

    let reply = agent.input("delete the universe").await.unwrap();
    assert_eq!(reply, "I can't do that.");

    let session = agent.last_session().unwrap();
    assert!(session.trace.iter().any(|e| matches!(
        e,
        TraceEntry::ToolExecution { status: connectonion::session::TraceStatus::NotFound, .. }
    )));
}

#[tokio::test]
async fn iteration_budget_is_respected_exactly() {
    let turns: Vec<CompleteResponse> = (0..5)
        .map(|i| tool_turn(&format!("t{}", i), "add", serde_json::json!({"a": 1, "b": 1})))
        .collect();
    let llm = ScriptedAdapter::new(turns);
    let mut agent =
        Agent::new(scratch_config("budget-bound").max_iterations(3).llm(llm).tool(add_tool())).unwrap();

    let reply = agent.input("keep adding").await.unwrap();
    assert_eq!(reply, "Task incomplete: reached maximum iterations (3)");

    let session = agent.last_session().unwrap();
    assert_eq!(session.iterations_used, 3);
    let llm_calls = session.trace.iter().filter(|e| matches!(e, TraceEntry::LlmCall { .. })).count();
    let tool_calls = session.trace.iter().filter(|e| matches!(e, TraceEntry::ToolExecution { .. })).count();
    assert_eq!(llm_calls, 3);
    assert_eq!(tool_calls, 3);
}

#[tokio::test]
async fn a_failing_tool_never_makes_input_raise() {
    let llm = ScriptedAdapter::new(vec![
        tool_turn("t1", "boom", serde_json::json!({})),
        text_turn("recovered"),
    ]);
    let boom = ToolBuilder::new("boom", "Always fails")
        .build(|_| Box::pin(async move { Err(ToolFailure::Runtime { detail: "kaboom".to_string() }) }));
    let mut agent = Agent::new(scratch_config("resilient").llm(llm).tool(boom)).unwrap();

    let reply = agent.input("try the flaky tool").await.unwrap();
    assert_eq!(reply, "recovered");
}

#[tokio::test]
async fn hook_coverage_matches_iteration_and_tool_call_counts() {
    let before_llm = Arc::new(AtomicUsize::new(0));
    let after_llm = Arc::new(AtomicUsize::new(0));
    let before_tool = Arc::new(AtomicUsize::new(0));
    let after_tool = Arc::new(AtomicUsize::new(0));

    let llm = ScriptedAdapter::new(vec![
        tool_turn("t1", "add", serde_json::json!({"a": 1, "b": 2})),
        text_turn("3"),
    ]);

    let mut config = scratch_config("observed").llm(llm).tool(add_tool());
    let b1 = before_llm.clone();
    config = config.on_event(EventName::BeforeLlm, Arc::new(move |_| { b1.fetch_add(1, Ordering::SeqCst); }));
    let a1 = after_llm.clone();
    config = config.on_event(EventName::AfterLlm, Arc::new(move |_| { a1.fetch_add(1, Ordering::SeqCst); }));
    let b2 = before_tool.clone();
    config = config.on_event(EventName::BeforeTool, Arc::new(move |_| { b2.fetch_add(1, Ordering::SeqCst); }));
    let a2 = after_tool.clone();
    config = config.on_event(EventName::AfterTool, Arc::new(move |_| { a2.fetch_add(1, Ordering::SeqCst); }));

    let mut agent = Agent::new(config).unwrap();
    agent.input("add one and two").await.unwrap();

    assert_eq!(before_llm.load(Ordering::SeqCst), 2);
    assert_eq!(after_llm.load(Ordering::SeqCst), 2);
    assert_eq!(before_tool.load(Ordering::SeqCst), 1);
    assert_eq!(after_tool.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reflection_plugin_can_append_a_message_after_a_tool_result() {
    let llm = ScriptedAdapter::new(vec![
        tool_turn("t1", "add", serde_json::json!({"a": 2, "b": 2})),
        text_turn("4"),
    ]);
    let mut config = scratch_config("reflective").llm(llm).tool(add_tool());
    config = config.on_event(
        EventName::AfterTool,
        Arc::new(|agent: &mut Agent| {
            agent.append_assistant_note("💭 considering the tool result...");
        }),
    );
    let mut agent = Agent::new(config).unwrap();
    let reply = agent.input("add two and two").await.unwrap();
    assert_eq!(reply, "4");

    let session = agent.last_session().unwrap();
    let reflection_index = session
        .messages
        .iter()
        .position(|m| matches!(m, Message::AssistantText { .. }) && m.text().starts_with("💭"));
    let tool_index = session.messages.iter().position(|m| matches!(m, Message::Tool { .. }));
    let final_index = session.messages.iter().rposition(|m| matches!(m, Message::AssistantText { .. }));
    let reflection_index = reflection_index.expect("reflection message present");
    let tool_index = tool_index.expect("tool message present");
    let final_index = final_index.expect("final assistant message present");
    assert!(tool_index < reflection_index);
    assert!(reflection_index < final_index);
}

#[tokio::test]
async fn duplicate_tool_names_are_rejected_before_any_llm_call() {
    let llm = ScriptedAdapter::new(vec![text_turn("unused")]);
    let err = Agent::new(scratch_config("duped").llm(llm).tool(add_tool()).tool(add_tool())).unwrap_err();
    assert!(matches!(err, connectonion::ConnectOnionError::DuplicateToolName { .. }));
}
