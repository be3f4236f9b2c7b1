use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolDispatchError {
    #[error("unknown tool '{name}'")]
    UnknownTool { name: String, call_id: String },
    #[error("invalid arguments for '{name}': {source}")]
    InvalidArgs {
        name: String,
        call_id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not serialize output of '{name}': {source}")]
    Serialization {
        name: String,
        call_id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ToolDispatchError {
    pub fn call_id(&self) -> &str {
        match self {
            ToolDispatchError::UnknownTool { call_id, .. }
            | ToolDispatchError::InvalidArgs { call_id, .. }
            | ToolDispatchError::Serialization { call_id, .. } => call_id,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ToolSetBuildError {
    #[error("tool name must not be empty or whitespace: {name:?}")]
    InvalidName { name: String },
    #[error("duplicate tool name: {name}")]
    DuplicateName { name: String },
}

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("failed to open database: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("{0}")]
    Query(#[source] sqlx::Error),
    #[error("failed to read bootstrap script {path}: {source}")]
    Bootstrap {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
