mod error;
mod llm;
mod tool_call;

pub use error::SqlwiseError;
pub use llm::{
    LlmRequest, LlmResponse, Message, Role, ToolCall, ToolCallPayload, ToolCallingLlm, ToolSpec,
    MALFORMED_FUNCTION_CALL,
};
pub use tool_call::{
    normalize, NormalizeError, ToolInvocation, MISSING_CALL_ID, RAW_ARGS_KEY, UNKNOWN_CALL_ID,
};

pub type Value = serde_json::Value;
