//! Tool Factory (C2) — turns invocable Rust closures into uniformly typed [`ToolRecord`]s.
//!
//! Rust has no runtime reflection over a function's signature, so instead of inspecting a
//! callable to derive its schema, [`ToolBuilder`] has the caller declare parameters explicitly.
//! The resulting [`ToolRecord`] pairs a name, description, and JSON-Schema `parameter_schema`
//! with a boxed async invoker closure.

use crate::error::{ConnectOnionError, ToolFailure};
use crate::schema::{object_schema, Schema};
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// The async invoker signature every [`ToolRecord`] wraps.
///
/// Takes the decoded JSON argument object and returns a string result or a [`ToolFailure`] — the
/// Tool Executor (C8) is responsible for the string coercion of non-string return values before
/// a tool body even sees this boundary, so invokers always deal in already-stringified results.
pub type ToolInvoker =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<String, ToolFailure>> + Send + Sync>;

/// A single declared parameter, used to build a tool's `parameter_schema`.
#[derive(Clone)]
pub struct ParamSpec {
    pub name: String,
    pub schema: Schema,
    pub required: bool,
}

impl ParamSpec {
    /// Declare a required parameter of the given JSON-Schema shape.
    pub fn required(name: impl Into<String>, schema: Schema) -> Self {
        Self { name: name.into(), schema, required: true }
    }

    /// Declare an optional parameter (a Rust `Option<T>` or a parameter with a default): a
    /// `T or None` shape is non-required and mapped as `T`.
    pub fn optional(name: impl Into<String>, schema: Schema) -> Self {
        Self { name: name.into(), schema, required: false }
    }
}

/// A named, schema-described, invocable tool.
///
/// Created once (at agent construction or via `Agent::add_tool`), immutable thereafter, and
/// destroyed with the agent. `name` must match `^[a-zA-Z_][a-zA-Z0-9_-]*$` and be unique within
/// an agent's tool set; both are enforced by [`collect`] and by `Agent::add_tool`, not by this
/// struct's constructor, so that a batch of tools can be validated together with one coherent
/// error.
#[derive(Clone)]
pub struct ToolRecord {
    pub name: String,
    pub description: String,
    pub parameter_schema: Schema,
    pub invoker: ToolInvoker,
}

impl fmt::Debug for ToolRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRecord")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameter_schema", &self.parameter_schema)
            .finish_non_exhaustive()
    }
}

/// Regex-free check for `^[a-zA-Z_][a-zA-Z0-9_-]*$`, avoiding a `regex` dependency for a pattern
/// this simple.
pub fn is_valid_tool_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Builds a single [`ToolRecord`] from an explicit parameter list and an async invoker.
///
/// ```
/// use connectonion::tool::ToolBuilder;
/// use connectonion::schema;
///
/// let record = ToolBuilder::new("add", "Add two integers")
///     .param_required("a", schema::integer())
///     .param_required("b", schema::integer())
///     .build(|args| {
///         Box::pin(async move {
///             let a = args["a"].as_i64().unwrap_or_default();
///             let b = args["b"].as_i64().unwrap_or_default();
///             Ok((a + b).to_string())
///         })
///     });
/// assert_eq!(record.name, "add");
/// ```
pub struct ToolBuilder {
    name: String,
    description: String,
    params: Vec<ParamSpec>,
}

impl ToolBuilder {
    /// Start building a tool. `description` should be the first non-empty line of the tool's
    /// documentation; pass `"Execute <name>"` if none is available.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into(), params: Vec::new() }
    }

    /// Declare a required parameter.
    pub fn param_required(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.params.push(ParamSpec::required(name, schema));
        self
    }

    /// Declare an optional parameter.
    pub fn param_optional(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.params.push(ParamSpec::optional(name, schema));
        self
    }

    /// Finish the tool, providing its async invoker.
    pub fn build<F>(self, invoker: F) -> ToolRecord
    where
        F: Fn(Value) -> BoxFuture<'static, Result<String, ToolFailure>> + Send + Sync + 'static,
    {
        let fields: Vec<(&str, Schema, bool)> = self
            .params
            .iter()
            .map(|p| (p.name.as_str(), p.schema.clone(), p.required))
            .collect();
        ToolRecord {
            name: self.name,
            description: self.description,
            parameter_schema: object_schema(&fields),
            invoker: Arc::new(invoker),
        }
    }
}

/// Input accepted by [`collect`] — a three-way dispatch: if already a [`ToolRecord`], pass
/// through; if a bare callable, it's been wrapped via [`ToolBuilder`] already; otherwise it's the
/// bound-methods-of-an-object case. Rust cannot enumerate a struct's public methods at runtime,
/// so that case is represented by a caller-supplied, pre-enumerated list of tool records sharing
/// one receiver rather than true reflection.
pub enum Collectible {
    /// Already a fully built tool record; passed through unchanged.
    Record(ToolRecord),
    /// A bare callable wrapped via [`ToolBuilder`] by the caller before handing it to `collect`.
    Tool(ToolRecord),
    /// The bound-methods-of-an-object case: a pre-enumerated list of tool records sharing one
    /// receiver (the `make_tools_from(object)` contract).
    FromObject(Vec<ToolRecord>),
}

/// `collect(items) → [ToolRecord]`, validating name uniqueness and the name pattern across the
/// whole batch in one pass, surfacing `DuplicateToolName` or `InvalidToolName` on the first
/// violation found.
pub fn collect(items: Vec<Collectible>) -> Result<Vec<ToolRecord>, ConnectOnionError> {
    let mut out = Vec::new();
    for item in items {
        match item {
            Collectible::Record(r) | Collectible::Tool(r) => out.push(r),
            Collectible::FromObject(records) => out.extend(records),
        }
    }
    validate_tool_set(&out)?;
    Ok(out)
}

/// Validate a tool set's name uniqueness and name-pattern conformance. Used by [`collect`] and by
/// `Agent::add_tool` so both entry points enforce the same two error conditions.
pub fn validate_tool_set(tools: &[ToolRecord]) -> Result<(), ConnectOnionError> {
    let mut seen = HashSet::new();
    for tool in tools {
        if !is_valid_tool_name(&tool.name) {
            return Err(ConnectOnionError::InvalidToolName { name: tool.name.clone() });
        }
        if !seen.insert(tool.name.clone()) {
            return Err(ConnectOnionError::DuplicateToolName { name: tool.name.clone() });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    fn add_tool() -> ToolRecord {
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

    #[test]
    fn builder_produces_object_schema_with_required_fields() {
        let tool = add_tool();
        assert_eq!(tool.parameter_schema["type"], "object");
        assert_eq!(tool.parameter_schema["required"], serde_json::json!(["a", "b"]));
    }

    #[tokio::test]
    async fn invoker_runs_and_returns_string() {
        let tool = add_tool();
        let out = (tool.invoker)(serde_json::json!({"a": 25, "b": 17})).await.unwrap();
        assert_eq!(out, "42");
    }

    #[test]
    fn name_validation_rejects_bad_identifiers() {
        assert!(is_valid_tool_name("add"));
        assert!(is_valid_tool_name("_private-ish"));
        assert!(!is_valid_tool_name("123start"));
        assert!(!is_valid_tool_name("has space"));
    }

    #[test]
    fn collect_rejects_duplicate_names() {
        let err = collect(vec![
            Collectible::Tool(add_tool()),
            Collectible::Tool(add_tool()),
        ])
        .unwrap_err();
        assert!(matches!(err, ConnectOnionError::DuplicateToolName { .. }));
    }

    #[test]
    fn collect_rejects_invalid_names() {
        let mut bad = add_tool();
        bad.name = "123bad".to_string();
        let err = collect(vec![Collectible::Tool(bad)]).unwrap_err();
        assert!(matches!(err, ConnectOnionError::InvalidToolName { .. }));
    }

    #[test]
    fn collect_passes_through_valid_batch() {
        let tools = collect(vec![Collectible::Tool(add_tool())]).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "add");
    }
}
