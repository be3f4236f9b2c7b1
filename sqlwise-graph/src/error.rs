use sqlwise_core::SqlwiseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node failed: {node}: {source}")]
    NodeFailed {
        node: String,
        #[source]
        source: SqlwiseError,
    },
    #[error("missing node: {node}")]
    MissingNode { node: String },
    #[error("no entry node set")]
    MissingEntry,
    #[error("invalid edge from '{from}' to '{to}'")]
    InvalidEdge { from: String, to: String },
    #[error("node '{node}' did not set a route")]
    UnsetRoute { node: String },
    #[error("node '{node}' has no outgoing edge")]
    DeadEnd { node: String },
    #[error("finish node '{finish}' is unreachable from entry '{entry}'")]
    Unreachable { entry: String, finish: String },
    #[error("Max steps exceeded: reached {reached}, limit {max}")]
    MaxStepsExceeded { max: usize, reached: usize },
}
