#![cfg(feature = "openai")]

use httpmock::prelude::*;
use serde_json::json;
use sqlwise_core::normalize;
use sqlwise_llm::{
    LlmRequest, Message, OpenAiCompatibleClient, ToolCallPayload, ToolCallingLlm,
};

fn client(server: &MockServer) -> OpenAiCompatibleClient {
    OpenAiCompatibleClient::builder()
        .base_url(server.url("/v1"))
        .api_key("sk-test")
        .model("gpt-4o-mini")
        .build()
        .unwrap()
}

fn request() -> LlmRequest {
    LlmRequest {
        model: "".to_string(),
        messages: vec![Message::user("How many customers are there?")],
        tools: vec![],
    }
}

#[tokio::test]
async fn tool_calls_with_json_arguments_become_records() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("authorization", "Bearer sk-test");
        then.status(200).json_body(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "db_query_tool",
                            "arguments": "{\"query\":\"SELECT COUNT(*) FROM Customer\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }));
    });

    let response = client(&server).invoke(request()).await.unwrap();
    mock.assert();

    assert_eq!(response.content, "");
    assert!(matches!(response.tool_calls[0], ToolCallPayload::Record(_)));
    let invocation = normalize(&response.tool_calls[0]).unwrap();
    assert_eq!(invocation.call_id, "call_abc");
    assert_eq!(
        invocation.arguments["query"],
        json!("SELECT COUNT(*) FROM Customer")
    );
}

#[tokio::test]
async fn tool_calls_with_broken_arguments_carry_an_embedded_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).json_body(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "tool_calls": [{
                        "id": "call_bad",
                        "type": "function",
                        "function": {"name": "describe_table", "arguments": "{table_name:"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }));
    });

    let response = client(&server).invoke(request()).await.unwrap();
    let invocation = normalize(&response.tool_calls[0]).unwrap();
    assert_eq!(invocation.call_id, "call_bad");
    assert!(invocation
        .error
        .as_deref()
        .unwrap()
        .starts_with("invalid JSON arguments"));
}

#[tokio::test]
async fn builder_rejects_missing_api_key() {
    let err = OpenAiCompatibleClient::builder()
        .model("gpt-4o-mini")
        .build()
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid configuration: missing api key");
}
