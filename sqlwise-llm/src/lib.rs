//! Completion service adapters.
//!
//! Every client implements [`ToolCallingLlm`]: it takes the full message
//! history plus the declared tool set and returns either text or tool-call
//! requests, along with the provider's finish reason.

pub mod providers;

pub use sqlwise_core::{
    LlmRequest, LlmResponse, Message, Role, ToolCall, ToolCallPayload, ToolCallingLlm, ToolSpec,
};

#[cfg(feature = "google")]
pub use providers::google::GoogleClient;

#[cfg(feature = "openai")]
pub use providers::openai_compatible::{OpenAiCompatibleBuilder, OpenAiCompatibleClient};
