#![cfg(feature = "google")]

use httpmock::prelude::*;
use serde_json::json;
use sqlwise_core::MALFORMED_FUNCTION_CALL;
use sqlwise_llm::{
    GoogleClient, LlmRequest, Message, Role, ToolCallPayload, ToolCallingLlm, ToolSpec,
};

fn client(server: &MockServer) -> GoogleClient {
    GoogleClient::new("test-key", "gemini-1.5-flash")
        .unwrap()
        .with_base_url(server.url(""))
}

fn request(tools: Vec<ToolSpec>) -> LlmRequest {
    LlmRequest {
        model: "".to_string(),
        messages: vec![Message::user("How many customers are there?")],
        tools,
    }
}

#[tokio::test]
async fn google_invoke_maps_text_response() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:generateContent")
            .query_param("key", "test-key")
            .json_body(json!({
                "contents": [
                    {
                        "role": "user",
                        "parts": [{"text": "How many customers are there?"}]
                    }
                ]
            }));
        then.status(200).json_body(json!({
            "candidates": [
                {
                    "content": {"role": "model", "parts": [{"text": "59"}]},
                    "finishReason": "STOP"
                }
            ]
        }));
    });

    let response = client(&server).invoke(request(vec![])).await.unwrap();
    assert_eq!(response.role, Role::Assistant);
    assert_eq!(response.content, "59");
    assert!(response.tool_calls.is_empty());
    assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
    mock.assert();
}

#[tokio::test]
async fn google_invoke_declares_tools_and_maps_function_calls() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:generateContent")
            .json_body(json!({
                "contents": [
                    {
                        "role": "user",
                        "parts": [{"text": "How many customers are there?"}]
                    }
                ],
                "tools": [
                    {
                        "functionDeclarations": [
                            {
                                "name": "db_query_tool",
                                "description": "run sql",
                                "parametersJsonSchema": {"type": "object"}
                            }
                        ]
                    }
                ],
                "toolConfig": {
                    "functionCallingConfig": {
                        "mode": "AUTO",
                        "allowedFunctionNames": ["db_query_tool"]
                    }
                }
            }));
        then.status(200).json_body(json!({
            "candidates": [
                {
                    "content": {
                        "role": "model",
                        "parts": [
                            {"functionCall": {"name": "list_tables", "args": {}}},
                            {"functionCall": {
                                "name": "db_query_tool",
                                "args": {"query": "SELECT COUNT(*) FROM Customer"}
                            }}
                        ]
                    },
                    "finishReason": "STOP"
                }
            ]
        }));
    });

    let tools = vec![ToolSpec {
        name: "db_query_tool".to_string(),
        description: "run sql".to_string(),
        parameters: json!({"type": "object"}),
    }];
    let response = client(&server).invoke(request(tools)).await.unwrap();
    mock.assert();

    let calls: Vec<_> = response
        .tool_calls
        .iter()
        .map(|payload| match payload {
            ToolCallPayload::Call(call) => (call.id.clone(), call.name.clone()),
            other => panic!("unexpected payload shape: {other:?}"),
        })
        .collect();
    assert_eq!(
        calls,
        vec![
            ("google_call_1".to_string(), "list_tables".to_string()),
            ("google_call_2".to_string(), "db_query_tool".to_string()),
        ]
    );
}

#[tokio::test]
async fn google_invoke_passes_malformed_function_call_through() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:generateContent");
        then.status(200).json_body(json!({
            "candidates": [{"finishReason": "MALFORMED_FUNCTION_CALL"}]
        }));
    });

    let response = client(&server).invoke(request(vec![])).await.unwrap();
    assert!(response.is_malformed_call());
    assert_eq!(
        response.finish_reason.as_deref(),
        Some(MALFORMED_FUNCTION_CALL)
    );
}

#[tokio::test]
async fn google_invoke_flags_non_model_content_role() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:generateContent");
        then.status(200).json_body(json!({
            "candidates": [
                {"content": {"role": "user", "parts": [{"text": "echo"}]}, "finishReason": "STOP"}
            ]
        }));
    });

    let response = client(&server).invoke(request(vec![])).await.unwrap();
    assert_ne!(response.role, Role::Assistant);
}

#[tokio::test]
async fn google_invoke_reports_blocked_generation() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:generateContent");
        then.status(200).json_body(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }));
    });

    let err = client(&server).invoke(request(vec![])).await.unwrap_err();
    assert_eq!(err.to_string(), "LLM provider failed: Generation blocked: SAFETY");
}

#[tokio::test]
async fn google_invoke_surfaces_api_error_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:generateContent");
        then.status(400)
            .json_body(json!({"error": {"code": 400, "message": "API key not valid"}}));
    });

    let err = client(&server).invoke(request(vec![])).await.unwrap_err();
    assert_eq!(err.to_string(), "LLM provider failed: API key not valid");
}
