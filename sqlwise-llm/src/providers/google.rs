//! Google Gemini API LLM client

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlwise_core::{
    LlmRequest, LlmResponse, Message, Role, SqlwiseError, ToolCall, ToolCallPayload,
    ToolCallingLlm, ToolSpec,
};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-latest";

pub struct GoogleClient {
    base_url: String,
    api_key: SecretString,
    model: String,
    http: Client,
}

impl std::fmt::Debug for GoogleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

impl GoogleClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, SqlwiseError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|err| SqlwiseError::InvalidConfig(err.to_string()))?;
        Ok(Self {
            base_url: GEMINI_BASE_URL.to_string(),
            api_key: SecretString::new(api_key.into()),
            model: model.into(),
            http,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn model_name(&self, request_model: &str) -> String {
        let model = if request_model.is_empty() {
            self.model.as_str()
        } else {
            request_model
        };
        let model = model.trim();
        model.strip_prefix("models/").unwrap_or(model).to_string()
    }

    fn generate_url(&self, request_model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model_name(request_model)
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<ToolConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters_json_schema: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolConfig {
    function_calling_config: FunctionCallingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FunctionCallingConfig {
    mode: String,
    allowed_function_names: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    message: String,
}

fn map_tools(tools: &[ToolSpec]) -> Option<Vec<GeminiTool>> {
    if tools.is_empty() {
        return None;
    }
    Some(vec![GeminiTool {
        function_declarations: tools
            .iter()
            .map(|tool| FunctionDeclaration {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters_json_schema: tool.parameters.clone(),
            })
            .collect(),
    }])
}

fn tool_config(tools: &[ToolSpec]) -> Option<ToolConfig> {
    if tools.is_empty() {
        return None;
    }
    Some(ToolConfig {
        function_calling_config: FunctionCallingConfig {
            mode: "AUTO".to_string(),
            allowed_function_names: tools.iter().map(|tool| tool.name.clone()).collect(),
        },
    })
}

/// Gemini requires `functionResponse.response` to be an object.
fn tool_output_object(content: &str) -> Value {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(other) => json!({ "content": other }),
        Err(_) => json!({ "content": content }),
    }
}

fn text_part(text: &str) -> Part {
    Part {
        text: Some(text.to_string()),
        ..Part::default()
    }
}

fn map_contents(messages: &[Message]) -> Vec<Content> {
    let mut tool_names_by_id: HashMap<String, String> = HashMap::new();
    let mut contents = Vec::new();

    for message in messages {
        match message.role {
            Role::System => {}
            Role::User => contents.push(Content {
                role: Some("user".to_string()),
                parts: vec![text_part(&message.content)],
            }),
            Role::Assistant => {
                let mut parts = Vec::new();
                if !message.content.is_empty() {
                    parts.push(text_part(&message.content));
                }
                for call in &message.tool_calls {
                    tool_names_by_id.insert(call.id.clone(), call.name.clone());
                    parts.push(Part {
                        function_call: Some(FunctionCall {
                            name: call.name.clone(),
                            args: call.args.clone(),
                        }),
                        ..Part::default()
                    });
                }
                if !parts.is_empty() {
                    contents.push(Content {
                        role: Some("model".to_string()),
                        parts,
                    });
                }
            }
            Role::Tool => {
                let name = message
                    .tool_call_id
                    .as_ref()
                    .and_then(|id| tool_names_by_id.get(id).cloned())
                    .unwrap_or_else(|| "tool".to_string());
                contents.push(Content {
                    role: Some("user".to_string()),
                    parts: vec![Part {
                        function_response: Some(FunctionResponse {
                            name,
                            response: tool_output_object(&message.content),
                        }),
                        ..Part::default()
                    }],
                });
            }
        }
    }

    contents
}

fn system_instruction(messages: &[Message]) -> Option<Content> {
    let parts: Vec<Part> = messages
        .iter()
        .filter(|message| matches!(message.role, Role::System))
        .map(|message| text_part(&message.content))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(Content { role: None, parts })
    }
}

fn build_request(input: &LlmRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: map_contents(&input.messages),
        system_instruction: system_instruction(&input.messages),
        tools: map_tools(&input.tools),
        tool_config: tool_config(&input.tools),
    }
}

fn is_blocked_finish_reason(reason: &str) -> bool {
    matches!(reason, "SAFETY" | "RECITATION" | "BLOCKLIST")
}

fn map_role(role: Option<&str>) -> Role {
    match role {
        None | Some("model") => Role::Assistant,
        Some(_) => Role::User,
    }
}

fn map_candidate(candidate: Candidate) -> Result<LlmResponse, SqlwiseError> {
    let finish_reason = candidate.finish_reason;
    let content = candidate.content.unwrap_or(Content {
        role: None,
        parts: Vec::new(),
    });
    let role = map_role(content.role.as_deref());

    let mut tool_calls = Vec::new();
    let mut text = String::new();
    for part in content.parts {
        if let Some(call) = part.function_call {
            let args = match call.args {
                Value::Null => json!({}),
                args => args,
            };
            tool_calls.push(ToolCallPayload::Call(ToolCall {
                id: format!("google_call_{}", tool_calls.len() + 1),
                name: call.name,
                args,
                error: None,
            }));
        }
        if let Some(chunk) = part.text {
            text.push_str(&chunk);
        }
    }

    if text.is_empty() && tool_calls.is_empty() {
        if let Some(reason) = finish_reason.as_deref().filter(|r| is_blocked_finish_reason(r)) {
            return Err(SqlwiseError::LlmProvider(format!(
                "Generation blocked: {reason}"
            )));
        }
    }

    Ok(LlmResponse {
        role,
        content: text,
        tool_calls,
        finish_reason,
    })
}

#[async_trait::async_trait]
impl ToolCallingLlm for GoogleClient {
    async fn invoke(&self, input: LlmRequest) -> Result<LlmResponse, SqlwiseError> {
        let request = build_request(&input);

        let response = self
            .http
            .post(self.generate_url(&input.model))
            .query(&[("key", self.api_key.expose_secret().as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|err| SqlwiseError::LlmProvider(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GoogleErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));
            return Err(SqlwiseError::LlmProvider(message));
        }

        let response = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|err| SqlwiseError::LlmProvider(err.to_string()))?;

        let candidate = response
            .candidates
            .and_then(|candidates| candidates.into_iter().next())
            .ok_or_else(|| SqlwiseError::LlmProvider("No candidates in response".to_string()))?;

        let mapped = map_candidate(candidate)?;
        tracing::debug!(
            finish_reason = ?mapped.finish_reason,
            tool_calls = mapped.tool_calls.len(),
            "gemini response received"
        );
        Ok(mapped)
    }
}
