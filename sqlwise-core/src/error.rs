use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlwiseError {
    #[error("LLM provider failed: {0}")]
    LlmProvider(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("{context}: {source}")]
    Interaction {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("{0}")]
    Custom(String),
}
