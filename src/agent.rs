//! Agent Loop (C9) — the bounded LLM-call / tool-dispatch state machine, plus the `Agent`
//! container (C6's Session Store, C7's Event Pipeline, and the agent's tool set all live here).
//!
//! Keeps one `Session` alive at a time ("exactly one session in-flight per agent", spec.md §3);
//! `add_tool`/`remove_tool` refuse to mutate the tool set while a session is in flight for the
//! same reason. The loop body below is a direct transcription of spec.md §4.9's pseudocode: fire
//! `user_input`, then iterate LLM call / tool dispatch until a terminal reply, a budget, or a
//! provider/hook failure ends it, then fire `task_complete` and hand the session to the History
//! Writer (C10) unconditionally.

use crate::config::{self, ConfigOverrides};
use crate::dispatcher::resolve_adapter;
use crate::error::ConnectOnionError;
use crate::event::{self, EventBinding, EventName, EventPipeline, Hook, Plugin};
use crate::executor::{self, ExecutorOptions};
use crate::history;
use crate::message::Message;
use crate::provider::{CallOptions, ProviderAdapter, ToolDefinition};
use crate::session::{Session, TraceEntry, TraceStatus};
use crate::tool::{self, Collectible, ToolRecord};
use chrono::Utc;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Builder-style configuration handed to [`Agent::new`].
///
/// Mirrors the options enumerated in spec.md §4.12: the scalar fields route through
/// [`crate::config::resolve`] (env / `.co/config.toml` / defaults precedence), while `tools`,
/// `on_events`, and `plugins` are Rust-native values that have no string-config representation.
#[derive(Default)]
pub struct AgentConfig {
    pub name: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub max_iterations: Option<u32>,
    pub temperature: Option<f32>,
    pub api_key: Option<String>,
    pub max_tokens: Option<usize>,
    pub tools: Vec<Collectible>,
    pub on_events: Vec<EventBinding>,
    pub plugins: Vec<Plugin>,
    pub project_root: Option<PathBuf>,
    /// Bypasses the `model` string / [`crate::dispatcher::resolve_adapter`] lookup entirely and
    /// uses this adapter directly, the way the teacher's `Agent::new(id, name, client)` takes a
    /// `ClientWrapper` by direct injection rather than resolving one from a string. Exists for
    /// embedders with an already-constructed adapter and for tests that stub `complete()`.
    pub llm_override: Option<Arc<dyn ProviderAdapter>>,
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn max_iterations(mut self, n: u32) -> Self {
        self.max_iterations = Some(n);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn tool(mut self, tool: ToolRecord) -> Self {
        self.tools.push(Collectible::Tool(tool));
        self
    }

    pub fn on_event(mut self, event: EventName, handler: Hook) -> Self {
        self.on_events.push(EventBinding::new(event, handler));
        self
    }

    pub fn plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Inject a pre-constructed adapter directly, skipping model-string resolution.
    pub fn llm(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.llm_override = Some(adapter);
        self
    }

    /// Override the directory `.co/config.toml` and the history log are resolved against.
    /// Defaults to the current working directory.
    pub fn project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }
}

/// A configured bundle of model selector, tools, system prompt, hooks, and iteration bound that
/// can run the tool-calling loop (spec.md GLOSSARY, "Agent").
pub struct Agent {
    name: String,
    system_prompt: Option<String>,
    model: String,
    max_iterations: u32,
    temperature: f32,
    tools: Vec<ToolRecord>,
    llm: Arc<dyn ProviderAdapter>,
    pipeline: EventPipeline,
    current_session: Option<Session>,
    /// The most recently finished session, kept around for the "Session snapshot" collaborator
    /// interface (spec.md §6.6: consumed by debugger/telemetry tooling) after `current_session`
    /// reverts to `None` at the end of `input()`.
    last_session: Option<Session>,
    executor_options: ExecutorOptions,
    max_tokens: usize,
    project_root: PathBuf,
    /// Records the first hook failure of an in-flight `input()` call, keyed by the event it was
    /// bound to. `task_complete` still fires once this is set (spec.md §9's open question,
    /// resolved: the session is always finalized and persisted before the error reaches the
    /// caller of `input()`), but it is what causes `input()` to return `Err` afterward.
    hook_error: Option<(EventName, String)>,
}

impl Agent {
    /// Construct an agent from `config`, validating tool-set uniqueness, resolving the model
    /// selector to a concrete provider adapter, and merging configuration per spec.md §4.12's
    /// precedence (constructor args > env > project file > defaults).
    pub fn new(config: AgentConfig) -> Result<Self, ConnectOnionError> {
        let project_root = config
            .project_root
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let llm_override = config.llm_override.clone();
        let overrides = ConfigOverrides {
            name: config.name,
            model: config.model,
            system_prompt: config.system_prompt,
            max_iterations: config.max_iterations,
            temperature: config.temperature,
            api_key: config.api_key,
        };
        let resolved = config::resolve(overrides, &project_root)?;

        let tools = tool::collect(config.tools)?;
        let llm = match llm_override {
            Some(adapter) => adapter,
            None => resolve_adapter(&resolved.model, resolved.api_key.as_deref())?,
        };

        let pipeline = EventPipeline { on_events: config.on_events, plugins: config.plugins };

        Ok(Self {
            name: resolved.name,
            system_prompt: resolved.system_prompt,
            model: resolved.model,
            max_iterations: resolved.max_iterations,
            temperature: resolved.temperature,
            tools,
            llm,
            pipeline,
            current_session: None,
            last_session: None,
            executor_options: ExecutorOptions::default(),
            max_tokens: config.max_tokens.unwrap_or(config::DEFAULT_MAX_TOKENS),
            project_root,
            hook_error: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// `agent.current_session` — observable by hooks while `input()` is running, `None` between
    /// calls.
    pub fn current_session(&self) -> Option<&Session> {
        self.current_session.as_ref()
    }

    /// The most recently finished session's frozen snapshot — `None` until the first `input()`
    /// call completes. Exists for debugger/telemetry consumers that want the trace after
    /// `current_session()` has reverted to `None` (spec.md §6.6).
    pub fn last_session(&self) -> Option<&Session> {
        self.last_session.as_ref()
    }

    pub(crate) fn session_mut(&mut self) -> &mut Session {
        self.current_session.as_mut().expect("session_mut called with no session in flight")
    }

    /// Append an `assistant-text` message to the in-flight session. The seam a hook uses to
    /// mutate `messages` (spec.md §3 Ownership: "hooks observe but may mutate `messages` (e.g.,
    /// reflection plugin injects an assistant message)"). A no-op target outside `input()` would
    /// be a bug in the caller, so this panics rather than silently dropping the message — same
    /// policy as `session_mut`.
    pub fn append_assistant_note(&mut self, content: impl Into<String>) {
        self.session_mut().push_message(Message::assistant_text(content.into()));
    }

    pub fn executor_options(&self) -> &ExecutorOptions {
        &self.executor_options
    }

    pub fn executor_options_mut(&mut self) -> &mut ExecutorOptions {
        &mut self.executor_options
    }

    pub(crate) fn find_tool(&self, name: &str) -> Option<ToolRecord> {
        self.tools.iter().find(|t| t.name == name).cloned()
    }

    /// `agent.add_tool(...)` — mutates the tool set between calls. Refused while `current_session`
    /// is active, and re-validates the whole batch so a duplicate/invalid name is still caught.
    pub fn add_tool(&mut self, tool: ToolRecord) -> Result<(), ConnectOnionError> {
        self.ensure_no_session_in_flight()?;
        let mut candidate = self.tools.clone();
        candidate.push(tool);
        tool::validate_tool_set(&candidate)?;
        self.tools = candidate;
        Ok(())
    }

    /// `agent.remove_tool(name)`. A no-op if no tool with that name is registered.
    pub fn remove_tool(&mut self, name: &str) -> Result<(), ConnectOnionError> {
        self.ensure_no_session_in_flight()?;
        self.tools.retain(|t| t.name != name);
        Ok(())
    }

    fn ensure_no_session_in_flight(&self) -> Result<(), ConnectOnionError> {
        if self.current_session.is_some() {
            return Err(ConnectOnionError::InvalidConfig {
                detail: "cannot mutate tools while a session is in flight".to_string(),
            });
        }
        Ok(())
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters_schema: t.parameter_schema.clone(),
            })
            .collect()
    }

    /// Fire every hook bound to `event`. Never panics or early-returns an error: a failing hook is
    /// recorded in `self.hook_error` (first failure wins) so the loop can check it at its next
    /// natural boundary, per [`crate::event::fire`]'s doc comment on why hook failures come back
    /// as data instead of unwinding through the loop directly.
    pub(crate) fn fire(&mut self, event: EventName) {
        let pipeline = self.pipeline.clone();
        if let Err(message) = event::fire(&pipeline, event, self) {
            if self.hook_error.is_none() {
                self.hook_error = Some((event, message));
            }
        }
    }

    /// Runs the bounded loop (spec.md §4.9) and returns the final assistant content. Does not
    /// raise on tool failures (those are reported to the LLM as `tool` messages by the executor).
    /// Raises on a fatal provider error surfacing to the caller only via the returned diagnostic
    /// string, never as `Err` — see spec.md §7: `ProviderError` yields a diagnostic
    /// `final_content`, not a raised error. `Err` is reserved for hook-propagated failures and for
    /// calling `input()` while a session is already in flight.
    pub async fn input(&mut self, prompt: impl Into<String>) -> Result<String, ConnectOnionError> {
        self.ensure_no_session_in_flight()?;
        self.hook_error = None;

        let prompt = prompt.into();
        let session = Session::new(self.name.clone(), self.system_prompt.as_deref(), prompt, self.max_tokens, Utc::now());
        self.current_session = Some(session);

        self.fire(EventName::UserInput);

        let mut final_content: Option<String> = None;
        let mut iteration: u32 = 0;

        if self.hook_error.is_none() {
            loop {
                iteration += 1;
                if iteration > self.max_iterations {
                    final_content = Some(format!(
                        "Task incomplete: reached maximum iterations ({})",
                        self.max_iterations
                    ));
                    break;
                }

                self.fire(EventName::BeforeLlm);
                if self.hook_error.is_some() {
                    break;
                }

                let tool_defs = self.tool_definitions();
                let messages_snapshot = self.session_mut().messages.clone();
                let call_options = CallOptions {
                    temperature: self.temperature,
                    max_completion_tokens: None,
                    structured_output: None,
                };
                let request_hash = hash_messages(&messages_snapshot);

                let started = Instant::now();
                let outcome = self.llm.complete(&messages_snapshot, &tool_defs, &call_options).await;
                let duration_ms = started.elapsed().as_millis() as u64;

                match outcome {
                    Ok(response) => {
                        let usage = self.llm.get_last_usage().await;
                        let trace = TraceEntry::llm_call(
                            iteration,
                            duration_ms,
                            request_hash,
                            response.content.clone(),
                            response.tool_calls.clone(),
                            usage,
                            TraceStatus::Success,
                            None,
                        );
                        let assistant_message = if response.tool_calls.is_empty() {
                            Message::assistant_text(response.content.clone().unwrap_or_default())
                        } else {
                            Message::assistant_tool_calls(response.tool_calls.clone())
                        };

                        {
                            let session = self.session_mut();
                            session.push_message(assistant_message);
                            session.push_trace(trace);
                            session.iterations_used = iteration;
                        }

                        self.fire(EventName::AfterLlm);
                        if self.hook_error.is_some() {
                            break;
                        }

                        if response.tool_calls.is_empty() {
                            final_content = Some(response.content.unwrap_or_default());
                            break;
                        }

                        executor::execute_tool_calls(self, &response.tool_calls, iteration).await;
                        if self.hook_error.is_some() {
                            break;
                        }
                    }
                    Err(source) => {
                        let trace = TraceEntry::llm_call(
                            iteration,
                            duration_ms,
                            request_hash,
                            None,
                            Vec::new(),
                            None,
                            TraceStatus::Error,
                            Some(source.to_string()),
                        );
                        self.session_mut().push_trace(trace);
                        self.session_mut().iterations_used = iteration;
                        final_content = Some(format!("Task failed: provider error: {}", source));
                        break;
                    }
                }
            }
        }

        let final_text = final_content.unwrap_or_else(|| match &self.hook_error {
            Some((event, message)) => format!("Task aborted: hook bound to '{}' failed: {}", event, message),
            None => "Cancelled".to_string(),
        });

        self.session_mut().finish(final_text.clone(), Utc::now());

        // task_complete fires unconditionally, even after a prior hook failure, so that
        // consumers of `current_session` (debuggers, the reflection-plugin style of hook) still
        // observe `final_content` before the session is handed to the History Writer.
        self.fire(EventName::TaskComplete);

        let session = self.current_session.take().expect("session set at top of input()");
        let log_path = history::default_log_path(&self.project_root, &self.name);
        history::append(&log_path, &session);
        self.last_session = Some(session);

        match self.hook_error.take() {
            Some((event, message)) => Err(ConnectOnionError::HookError {
                event: event.to_string(),
                source: message.into(),
            }),
            None => Ok(final_text),
        }
    }

    /// A minimal agent with no tools and an adapter that errors if ever invoked, for unit tests
    /// elsewhere in this crate that exercise the event pipeline or tool executor without running
    /// a real LLM round.
    #[cfg(test)]
    pub(crate) fn test_instance() -> Self {
        struct UnreachableAdapter;

        #[async_trait::async_trait]
        impl ProviderAdapter for UnreachableAdapter {
            async fn complete(
                &self,
                _messages: &[Message],
                _tools: &[ToolDefinition],
                _options: &CallOptions,
            ) -> Result<crate::provider::CompleteResponse, Box<dyn std::error::Error + Send + Sync>> {
                Err("test adapter should not be invoked".into())
            }

            fn model_name(&self) -> &str {
                "test-model"
            }
        }

        Self {
            name: "test-agent".to_string(),
            system_prompt: None,
            model: "test-model".to_string(),
            max_iterations: 10,
            temperature: 0.1,
            tools: Vec::new(),
            llm: Arc::new(UnreachableAdapter),
            pipeline: EventPipeline::new(),
            current_session: Some(Session::new("test-agent", None, "test", 100_000, Utc::now())),
            last_session: None,
            executor_options: ExecutorOptions::default(),
            max_tokens: 100_000,
            project_root: PathBuf::from("."),
            hook_error: None,
        }
    }
}

/// Hash a request's message sequence for the `llm_call` trace entry's `request_messages_hash`
/// field — a debugging/caching aid, not a content-addressing scheme, so `DefaultHasher` is
/// sufficient (unlike `ToolFailure`'s diagnostics, this never needs cross-process stability).
fn hash_messages(messages: &[Message]) -> String {
    let mut hasher = DefaultHasher::new();
    for message in messages {
        let serialized = serde_json::to_string(message).unwrap_or_default();
        serialized.hash(&mut hasher);
    }
    format!("{:016x}", hasher.finish())
}
