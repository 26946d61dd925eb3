//! ConnectOnion core engine: a bounded LLM tool-calling agent loop.
//!
//! Drives a large language model through a bounded tool-calling loop until it produces a
//! terminal natural-language reply or the iteration budget is exhausted. See [`agent::Agent`]
//! for the public entry point and [`one_shot::one_shot`] for the stateless single-round helper.

pub mod agent;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod executor;
pub mod history;
pub mod log_sink;
pub mod message;
pub mod one_shot;
pub mod provider;
pub mod providers;
pub mod schema;
pub mod session;
pub mod tool;

pub use agent::{Agent, AgentConfig};
pub use error::{ConnectOnionError, ToolFailure};
pub use event::{EventBinding, EventName, Plugin};
pub use message::{Message, ToolCall};
pub use one_shot::{one_shot, OneShotRequest, OneShotResult};
pub use session::{Session, TraceEntry, TraceStatus};
pub use tool::{Collectible, ToolBuilder, ToolRecord};
