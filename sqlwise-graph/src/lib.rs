//! A small state-graph executor: named nodes, static and conditional edges,
//! a finish node and a step limit.

mod config;
mod error;
mod graph;
mod observer;
mod program;
mod state;

pub use config::ExecutionConfig;
pub use error::GraphError;
pub use graph::{ExecutableGraph, GraphBuilder, GraphNode, Router};
pub use observer::Observer;
pub use program::GraphProgram;
pub use state::{GraphState, StateSchema, StateUpdate};
