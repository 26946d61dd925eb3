//! Event Pipeline — named lifecycle hooks plus the `on_events`/`plugins` binding lists an agent
//! exposes for observability and mutation.
//!
//! Lifecycle observability here is a small, named set of phases (`user_input`, `before_llm`,
//! `after_llm`, `before_tool`, `after_tool`, `task_complete`), each firing an ordered list of
//! synchronous callbacks that take the agent as their sole argument, rather than one large
//! handler trait with a fixed catalog of event variants. That keeps the shape open: a caller
//! binds exactly the phases it cares about, and a "plugin" is just a reusable, pre-built list of
//! such bindings.

use crate::agent::Agent;
use std::fmt;
use std::sync::Arc;

/// The six named lifecycle phases an agent run fires hooks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    UserInput,
    BeforeLlm,
    AfterLlm,
    BeforeTool,
    AfterTool,
    TaskComplete,
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventName::UserInput => "user_input",
            EventName::BeforeLlm => "before_llm",
            EventName::AfterLlm => "after_llm",
            EventName::BeforeTool => "before_tool",
            EventName::AfterTool => "after_tool",
            EventName::TaskComplete => "task_complete",
        };
        f.write_str(s)
    }
}

/// A callback bound to a named lifecycle event. Receives the agent as its sole argument.
pub type Hook = Arc<dyn Fn(&mut Agent) + Send + Sync>;

/// One `(event, handler)` pair — an event binding.
#[derive(Clone)]
pub struct EventBinding {
    pub event: EventName,
    pub handler: Hook,
}

impl EventBinding {
    pub fn new(event: EventName, handler: Hook) -> Self {
        Self { event, handler }
    }
}

/// A reusable, ordered list of hook bindings — a plugin.
pub type Plugin = Vec<EventBinding>;

/// Holds an agent's `on_events` and `plugins` lists and fires them in declared order: `on_events`
/// bindings first, then each plugin's bindings, plugins themselves in the order they were added.
#[derive(Clone, Default)]
pub struct EventPipeline {
    pub on_events: Vec<EventBinding>,
    pub plugins: Vec<Plugin>,
}

impl EventPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook directly on this agent's `on_events` list.
    pub fn bind(&mut self, event: EventName, handler: Hook) {
        self.on_events.push(EventBinding::new(event, handler));
    }

    /// Register a reusable plugin (an ordered list of bindings), appended after existing plugins.
    pub fn add_plugin(&mut self, plugin: Plugin) {
        self.plugins.push(plugin);
    }

    fn matching_bindings(&self, event: EventName) -> Vec<Hook> {
        let mut out: Vec<Hook> = self
            .on_events
            .iter()
            .filter(|b| b.event == event)
            .map(|b| b.handler.clone())
            .collect();
        for plugin in &self.plugins {
            out.extend(plugin.iter().filter(|b| b.event == event).map(|b| b.handler.clone()));
        }
        out
    }
}

/// Fire every hook bound to `event`, in canonical order, against `agent`.
///
/// Hooks run synchronously on the agent loop's thread of control — this function never spawns
/// anything. A panicking hook is caught rather than unwinding straight through the loop: its
/// message comes back as `Err` so the caller (the agent loop) can still fire `task_complete`
/// before surfacing the failure to `input()`'s caller, instead of this function special-casing
/// that ordering itself.
pub fn fire(pipeline: &EventPipeline, event: EventName, agent: &mut Agent) -> Result<(), String> {
    for hook in pipeline.matching_bindings(event) {
        let agent = std::panic::AssertUnwindSafe(&mut *agent);
        let result = std::panic::catch_unwind(move || hook(agent.0));
        if let Err(payload) = result {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "hook panicked".to_string());
            return Err(message);
        }
    }
    Ok(())
}
