//! Generic OpenAI-compatible LLM client
//!
//! Supports any provider using OpenAI's chat completions format (OpenAI,
//! DeepSeek, Together, a local gateway, ...).

use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlwise_core::{
    LlmRequest, LlmResponse, Message, Role, SqlwiseError, ToolCall, ToolCallPayload,
    ToolCallingLlm, ToolSpec,
};
use url::Url;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Serialize, Debug, Clone)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ChatTool>>,
    pub stream: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: WireFunction,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WireFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct ChatTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ChatToolFunction,
}

#[derive(Serialize, Debug, Clone)]
pub struct ChatToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Choice {
    pub message: ChatMessage,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct OpenAiError {
    pub error: ErrorDetail,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ErrorDetail {
    pub message: String,
}

fn function_kind() -> String {
    "function".to_string()
}

pub struct OpenAiCompatibleClient {
    endpoint: String,
    api_key: SecretString,
    model: String,
    http: Client,
}

impl std::fmt::Debug for OpenAiCompatibleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Default)]
pub struct OpenAiCompatibleBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    timeout: Option<Duration>,
}

impl OpenAiCompatibleClient {
    pub fn builder() -> OpenAiCompatibleBuilder {
        OpenAiCompatibleBuilder::default()
    }
}

impl OpenAiCompatibleBuilder {
    pub fn base_url(mut self, value: impl Into<String>) -> Self {
        self.base_url = Some(value.into());
        self
    }

    pub fn api_key(mut self, value: impl Into<String>) -> Self {
        self.api_key = Some(value.into());
        self
    }

    pub fn model(mut self, value: impl Into<String>) -> Self {
        self.model = Some(value.into());
        self
    }

    pub fn timeout(mut self, value: Duration) -> Self {
        self.timeout = Some(value);
        self
    }

    pub fn build(self) -> Result<OpenAiCompatibleClient, SqlwiseError> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| OPENAI_BASE_URL.to_string());
        Url::parse(&base_url)
            .map_err(|err| SqlwiseError::InvalidConfig(format!("invalid base url: {err}")))?;

        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| SqlwiseError::InvalidConfig("missing api key".to_string()))?;
        let model = self
            .model
            .filter(|model| !model.trim().is_empty())
            .ok_or_else(|| SqlwiseError::InvalidConfig("missing model".to_string()))?;

        let http = Client::builder()
            .timeout(self.timeout.unwrap_or(Duration::from_secs(120)))
            .build()
            .map_err(|err| SqlwiseError::InvalidConfig(err.to_string()))?;

        Ok(OpenAiCompatibleClient {
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: SecretString::new(api_key),
            model,
            http,
        })
    }
}

fn role_name(role: &Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn map_message(message: &Message) -> ChatMessage {
    let tool_calls = if message.tool_calls.is_empty() {
        None
    } else {
        Some(
            message
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    kind: function_kind(),
                    function: WireFunction {
                        name: call.name.clone(),
                        arguments: call.args.to_string(),
                    },
                })
                .collect(),
        )
    };
    ChatMessage {
        role: role_name(&message.role).to_string(),
        content: Some(message.content.clone()),
        tool_call_id: message.tool_call_id.clone(),
        tool_calls,
    }
}

fn map_tools(tools: &[ToolSpec]) -> Option<Vec<ChatTool>> {
    if tools.is_empty() {
        return None;
    }
    Some(
        tools
            .iter()
            .map(|tool| ChatTool {
                kind: function_kind(),
                function: ChatToolFunction {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                },
            })
            .collect(),
    )
}

/// Arguments arrive as a JSON-encoded string; a call whose string does not
/// decode is kept with an embedded error instead of being dropped.
fn map_tool_call(call: WireToolCall) -> ToolCallPayload {
    match serde_json::from_str::<Value>(&call.function.arguments) {
        Ok(args) => {
            let mut record = serde_json::Map::new();
            record.insert("id".to_string(), Value::String(call.id));
            record.insert("name".to_string(), Value::String(call.function.name));
            record.insert("args".to_string(), args);
            ToolCallPayload::Record(record)
        }
        Err(err) => ToolCallPayload::Call(ToolCall {
            id: call.id,
            name: call.function.name,
            args: Value::String(call.function.arguments),
            error: Some(format!("invalid JSON arguments: {err}")),
        }),
    }
}

fn map_choice(choice: Choice) -> LlmResponse {
    let role = match choice.message.role.as_str() {
        "assistant" => Role::Assistant,
        _ => Role::User,
    };
    LlmResponse {
        role,
        content: choice.message.content.unwrap_or_default(),
        tool_calls: choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(map_tool_call)
            .collect(),
        finish_reason: choice.finish_reason,
    }
}

#[async_trait::async_trait]
impl ToolCallingLlm for OpenAiCompatibleClient {
    async fn invoke(&self, input: LlmRequest) -> Result<LlmResponse, SqlwiseError> {
        let model = if input.model.is_empty() {
            self.model.clone()
        } else {
            input.model.clone()
        };
        let request = ChatCompletionRequest {
            model,
            messages: input.messages.iter().map(map_message).collect(),
            tools: map_tools(&input.tools),
            stream: false,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|err| SqlwiseError::LlmProvider(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));
            return Err(SqlwiseError::LlmProvider(message));
        }

        let response = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|err| SqlwiseError::LlmProvider(err.to_string()))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SqlwiseError::LlmProvider("No choices in response".to_string()))?;

        let mapped = map_choice(choice);
        tracing::debug!(
            finish_reason = ?mapped.finish_reason,
            tool_calls = mapped.tool_calls.len(),
            "chat completion received"
        );
        Ok(mapped)
    }
}
