//! Error types surfaced by the agent execution engine.
//!
//! Every fallible operation in this crate returns a [`ConnectOnionError`] rather than a generic
//! boxed error, so callers can match on the specific failure kind (tool lookup miss vs. a
//! malformed model selector vs. a hook panic, for instance) instead of string-sniffing a message.
//! The provider adapters still surface transport-level failures as `Box<dyn Error>` internally
//! (matching [`crate::provider::ProviderAdapter`]'s signature) and those get wrapped into
//! [`ConnectOnionError::ProviderError`] at the loop boundary.

use std::error::Error;
use std::fmt;

/// The error kinds the core engine can raise, one variant per row of the error table.
#[derive(Debug)]
pub enum ConnectOnionError {
    /// A tool name did not match `^[a-zA-Z_][a-zA-Z0-9_-]*$`.
    InvalidToolName { name: String },
    /// Two tools were registered with the same name within one agent.
    DuplicateToolName { name: String },
    /// The dispatcher could not resolve a model string to a known adapter.
    UnknownModel { model: String },
    /// `one_shot`'s structured-output coercion failed validation against the caller's schema.
    StructuredOutputMismatch { detail: String },
    /// A provider adapter failed after exhausting its retry budget.
    ProviderError { source: Box<dyn Error + Send + Sync> },
    /// A hook bound via `on_events`/`plugins` propagated an error out of the loop.
    HookError { event: String, source: Box<dyn Error + Send + Sync> },
    /// `Agent::new` was given a `max_iterations` less than 1.
    InvalidConfig { detail: String },
}

impl fmt::Display for ConnectOnionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectOnionError::InvalidToolName { name } => {
                write!(f, "invalid tool name '{}': must match ^[a-zA-Z_][a-zA-Z0-9_-]*$", name)
            }
            ConnectOnionError::DuplicateToolName { name } => {
                write!(f, "duplicate tool name '{}'", name)
            }
            ConnectOnionError::UnknownModel { model } => {
                write!(f, "unknown model selector '{}'", model)
            }
            ConnectOnionError::StructuredOutputMismatch { detail } => {
                write!(f, "structured output did not match the requested schema: {}", detail)
            }
            ConnectOnionError::ProviderError { source } => {
                write!(f, "provider error: {}", source)
            }
            ConnectOnionError::HookError { event, source } => {
                write!(f, "hook bound to '{}' failed: {}", event, source)
            }
            ConnectOnionError::InvalidConfig { detail } => {
                write!(f, "invalid agent configuration: {}", detail)
            }
        }
    }
}

impl Error for ConnectOnionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConnectOnionError::ProviderError { source } => Some(source.as_ref()),
            ConnectOnionError::HookError { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Per-tool-call failure kinds, reported to the LLM as a `tool` message rather than raised.
///
/// These never escape [`crate::agent::Agent::input`] — the executor converts each variant into
/// a diagnostic string appended as the tool's result content.
#[derive(Debug, Clone)]
pub enum ToolFailure {
    /// No registered tool matches the requested name.
    NotFound { name: String },
    /// The call's `arguments` value failed to decode as a JSON object.
    ArgumentDecode { detail: String },
    /// The tool's invoker returned an error.
    Runtime { detail: String },
    /// The tool's invoker did not complete within the configured timeout.
    Timeout { elapsed_ms: u64 },
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolFailure::NotFound { name } => write!(f, "Tool '{}' not found", name),
            ToolFailure::ArgumentDecode { detail } => write!(f, "Invalid arguments: {}", detail),
            ToolFailure::Runtime { detail } => write!(f, "Error: {}", detail),
            ToolFailure::Timeout { elapsed_ms } => {
                write!(f, "Error: tool timed out after {} ms", elapsed_ms)
            }
        }
    }
}

impl Error for ToolFailure {}
