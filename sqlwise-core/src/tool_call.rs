use serde_json::Map;
use thiserror::Error;

use crate::{ToolCall, ToolCallPayload, Value};

/// Key under which non-object tool arguments are preserved.
pub const RAW_ARGS_KEY: &str = "__raw_args__";
/// Call id reported for a recognised call that has no id.
pub const MISSING_CALL_ID: &str = "missing_id";
/// Call id reported for a payload whose structure is not recognised.
pub const UNKNOWN_CALL_ID: &str = "unknown_tool_id";

/// Canonical form of a tool-call request, independent of its wire shape.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Map<String, Value>,
    pub call_id: String,
    pub error: Option<String>,
}

impl ToolInvocation {
    pub fn to_tool_call(&self) -> ToolCall {
        ToolCall {
            id: self.call_id.clone(),
            name: self.name.clone(),
            args: Value::Object(self.arguments.clone()),
            error: None,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("Unknown tool call structure: {payload}")]
    UnknownStructure { payload: String },
    #[error("Parsed tool call missing name or id: {payload}")]
    MissingField { call_id: String, payload: String },
}

impl NormalizeError {
    /// The call id a tool-result entry for this failure should be tied to.
    pub fn call_id(&self) -> &str {
        match self {
            NormalizeError::UnknownStructure { .. } => UNKNOWN_CALL_ID,
            NormalizeError::MissingField { call_id, .. } => call_id,
        }
    }
}

pub fn normalize(payload: &ToolCallPayload) -> Result<ToolInvocation, NormalizeError> {
    let (name, raw_args, call_id, error) = match payload {
        ToolCallPayload::Call(call) => (
            non_empty(Some(call.name.as_str())),
            Some(&call.args),
            non_empty(Some(call.id.as_str())),
            call.error.clone().filter(|error| !error.is_empty()),
        ),
        ToolCallPayload::Record(record) => (
            non_empty(record.get("name").and_then(Value::as_str)),
            record.get("args"),
            non_empty(record.get("id").and_then(Value::as_str)),
            None,
        ),
        ToolCallPayload::Opaque(value) => {
            return Err(NormalizeError::UnknownStructure {
                payload: value.to_string(),
            })
        }
    };

    let (Some(name), Some(call_id)) = (name, call_id.clone()) else {
        return Err(NormalizeError::MissingField {
            call_id: call_id.unwrap_or_else(|| MISSING_CALL_ID.to_string()),
            payload: describe(payload),
        });
    };

    let arguments = coerce_arguments(&name, raw_args);
    Ok(ToolInvocation {
        name,
        arguments,
        call_id,
        error,
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn coerce_arguments(name: &str, raw: Option<&Value>) -> Map<String, Value> {
    match raw {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(other) => {
            tracing::warn!(tool = name, args = %other, "tool call has non-object arguments");
            let text = match other {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            let mut map = Map::new();
            map.insert(RAW_ARGS_KEY.to_string(), Value::String(text));
            map
        }
    }
}

fn describe(payload: &ToolCallPayload) -> String {
    serde_json::to_string(payload).unwrap_or_else(|_| format!("{payload:?}"))
}
