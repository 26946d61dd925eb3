//! Type Mapper (C1) — maps Rust parameter shapes to JSON-Schema fragments.
//!
//! Rust has no runtime signature inspection, so this module is a set of small builder calls
//! (`schema::integer()`, `schema::array(schema::string())`, ...) standing in for the usual
//! integer/number/boolean/string/array/object variant set, plus a `uniqueItems` set variant and
//! a string-enum variant for the cases a plain JSON-Schema primitive doesn't cover.

use serde_json::{json, Value};

/// A single JSON-Schema fragment, as produced by the functions in this module.
pub type Schema = Value;

/// `{"type": "integer"}`
pub fn integer() -> Schema {
    json!({"type": "integer"})
}

/// `{"type": "number"}`
pub fn number() -> Schema {
    json!({"type": "number"})
}

/// `{"type": "boolean"}`
pub fn boolean() -> Schema {
    json!({"type": "boolean"})
}

/// `{"type": "string"}`
pub fn string() -> Schema {
    json!({"type": "string"})
}

/// `{"type": "array", "items": <item>}`
pub fn array(item: Schema) -> Schema {
    json!({"type": "array", "items": item})
}

/// `{"type": "array", "items": <item>, "uniqueItems": true}` — a set of T.
pub fn set(item: Schema) -> Schema {
    json!({"type": "array", "items": item, "uniqueItems": true})
}

/// `{"type": "object", "additionalProperties": <value_schema>}` — a mapping from string to T.
pub fn map(value_schema: Schema) -> Schema {
    json!({"type": "object", "additionalProperties": value_schema})
}

/// `{"type": "string", "enum": [...]}` — an enumeration with string variants.
pub fn string_enum(variants: &[&str]) -> Schema {
    json!({"type": "string", "enum": variants})
}

/// The safe fallback for an unknown or un-annotated parameter type.
pub fn unknown() -> Schema {
    string()
}

/// Implemented by the handful of primitive Rust shapes the Tool Factory accepts as tool
/// parameters. `Option<T>` is handled separately by [`crate::tool::ParamSpec`] (it marks the
/// parameter non-required rather than changing its schema) rather than through this trait.
pub trait ToParamSchema {
    /// The JSON-Schema fragment describing this Rust type.
    fn param_schema() -> Schema;
}

impl ToParamSchema for i64 {
    fn param_schema() -> Schema {
        integer()
    }
}

impl ToParamSchema for f64 {
    fn param_schema() -> Schema {
        number()
    }
}

impl ToParamSchema for bool {
    fn param_schema() -> Schema {
        boolean()
    }
}

impl ToParamSchema for String {
    fn param_schema() -> Schema {
        string()
    }
}

impl<T: ToParamSchema> ToParamSchema for Vec<T> {
    fn param_schema() -> Schema {
        array(T::param_schema())
    }
}

impl<T: ToParamSchema> ToParamSchema for std::collections::HashMap<String, T> {
    fn param_schema() -> Schema {
        map(T::param_schema())
    }
}

/// Assemble a full tool `parameter_schema` object from a parameter list:
/// `{type: "object", properties: {...}, required: [...]}`.
pub fn object_schema(properties: &[(&str, Schema, bool)]) -> Schema {
    let mut props = serde_json::Map::new();
    let mut required = Vec::new();
    for (name, schema, is_required) in properties {
        props.insert(name.to_string(), schema.clone());
        if *is_required {
            required.push(Value::String(name.to_string()));
        }
    }
    json!({
        "type": "object",
        "properties": Value::Object(props),
        "required": required,
    })
}
