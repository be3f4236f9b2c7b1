use serde_json::json;
use sqlwise_core::{
    normalize, NormalizeError, ToolCall, ToolCallPayload, MISSING_CALL_ID, RAW_ARGS_KEY,
    UNKNOWN_CALL_ID,
};

fn record(value: serde_json::Value) -> ToolCallPayload {
    match value {
        serde_json::Value::Object(map) => ToolCallPayload::Record(map),
        other => panic!("not an object: {other}"),
    }
}

#[test]
fn record_and_call_shapes_normalize_to_the_same_invocation() {
    let from_record = normalize(&record(json!({
        "name": "describe_table",
        "args": {"table_name": "Customer"},
        "id": "call-1"
    })))
    .unwrap();

    let from_call = normalize(&ToolCallPayload::Call(ToolCall {
        id: "call-1".to_string(),
        name: "describe_table".to_string(),
        args: json!({"table_name": "Customer"}),
        error: None,
    }))
    .unwrap();

    assert_eq!(from_record, from_call);
    assert_eq!(from_call.name, "describe_table");
    assert_eq!(from_call.call_id, "call-1");
    assert_eq!(from_call.arguments["table_name"], json!("Customer"));
    assert!(from_call.error.is_none());
}

#[test]
fn embedded_error_is_carried_through() {
    let invocation = normalize(&ToolCallPayload::Call(ToolCall {
        id: "call-2".to_string(),
        name: "db_query_tool".to_string(),
        args: json!(null),
        error: Some("arguments are not valid JSON".to_string()),
    }))
    .unwrap();

    assert_eq!(
        invocation.error.as_deref(),
        Some("arguments are not valid JSON")
    );
    assert!(invocation.arguments.is_empty());
}

#[test]
fn missing_id_reports_placeholder_call_id() {
    let err = normalize(&record(json!({"name": "list_tables", "args": {}}))).unwrap_err();
    assert!(matches!(err, NormalizeError::MissingField { .. }));
    assert_eq!(err.call_id(), MISSING_CALL_ID);
}

#[test]
fn missing_name_keeps_the_call_id() {
    let err = normalize(&ToolCallPayload::Call(ToolCall {
        id: "call-3".to_string(),
        name: "".to_string(),
        args: json!({}),
        error: None,
    }))
    .unwrap_err();
    assert_eq!(err.call_id(), "call-3");
    assert!(err.to_string().starts_with("Parsed tool call missing name or id"));
}

#[test]
fn opaque_payload_is_an_unknown_structure() {
    let err = normalize(&ToolCallPayload::Opaque(json!(42))).unwrap_err();
    assert_eq!(err.call_id(), UNKNOWN_CALL_ID);
    assert_eq!(err.to_string(), "Unknown tool call structure: 42");
}

#[test]
fn non_object_arguments_are_preserved_as_raw_text() {
    let invocation = normalize(&record(json!({
        "name": "db_query_tool",
        "args": "SELECT 1",
        "id": "call-4"
    })))
    .unwrap();
    assert_eq!(invocation.arguments[RAW_ARGS_KEY], json!("SELECT 1"));
}

#[test]
fn canonical_invocation_converts_back_to_a_tool_call() {
    let invocation = normalize(&record(json!({
        "name": "db_query_tool",
        "args": {"query": "SELECT 1"},
        "id": "call-5"
    })))
    .unwrap();
    let call = invocation.to_tool_call();
    assert_eq!(call.id, "call-5");
    assert_eq!(call.args, json!({"query": "SELECT 1"}));
}
