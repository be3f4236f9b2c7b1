use std::fmt;

use serde::{Deserialize, Serialize};
use sqlwise_graph::StateSchema;

/// Workflow stages; also the node names the graph is built with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Reasoning,
    HumanApproval,
    GraphTools,
    End,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Reasoning => "Reasoning",
            Stage::HumanApproval => "HumanApproval",
            Stage::GraphTools => "GraphTools",
            Stage::End => "End",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The record threaded through every stage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub raw_query: String,
    pub result: Option<String>,
    pub approved: bool,
    pub plot_confirm: bool,
    /// Routing signal written by every stage before it returns.
    pub next: Option<Stage>,
    /// Completion rounds already spent by Reasoning when it re-enters itself.
    #[serde(default)]
    pub reasoning_rounds: u32,
}

impl AgentState {
    pub fn new(raw_query: impl Into<String>) -> Self {
        Self {
            raw_query: raw_query.into(),
            ..Self::default()
        }
    }

    /// Drops the routing signal left by the previous stage, so a stage that
    /// returns without choosing a successor fails routing instead of reusing it.
    pub fn without_route(mut self) -> Self {
        self.next = None;
        self
    }
}

impl StateSchema for AgentState {}
