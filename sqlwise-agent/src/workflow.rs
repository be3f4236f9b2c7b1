use std::sync::Arc;

use sqlwise_core::ToolCallingLlm;
use sqlwise_graph::{ExecutableGraph, ExecutionConfig, GraphBuilder, GraphError, GraphState};
use sqlwise_tools::ToolSet;

use crate::{
    AgentState, ConfirmationProvider, EndNode, GraphToolsNode, HumanApprovalNode, Plotter,
    ReasoningNode, Stage, DEFAULT_MAX_ITERATIONS,
};

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub model: String,
    pub max_iterations: u32,
    pub max_steps: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_steps: ExecutionConfig::default().max_steps.unwrap_or(50),
        }
    }
}

fn route(state: &GraphState<AgentState>) -> Option<String> {
    state.data.next.map(|stage| stage.as_str().to_string())
}

fn paths(stages: &[Stage]) -> Vec<(&'static str, &'static str)> {
    stages
        .iter()
        .map(|stage| (stage.as_str(), stage.as_str()))
        .collect()
}

/// Reasoning -> HumanApproval -> GraphTools -> End, every hop chosen by the
/// `next` field the stage just wrote.
pub fn build_workflow(
    llm: Arc<dyn ToolCallingLlm>,
    tools: ToolSet,
    confirm: Arc<dyn ConfirmationProvider>,
    plotter: Arc<dyn Plotter>,
    config: &AgentConfig,
) -> Result<ExecutableGraph<AgentState>, GraphError> {
    let reasoning = ReasoningNode::builder()
        .llm(llm)
        .tools(tools)
        .model(config.model.clone())
        .max_iterations(config.max_iterations)
        .build()
        .map_err(|source| GraphError::NodeFailed {
            node: Stage::Reasoning.to_string(),
            source,
        })?;

    GraphBuilder::new()
        .add_node(Stage::Reasoning.as_str(), reasoning)
        .add_node(Stage::HumanApproval.as_str(), HumanApprovalNode::new(confirm.clone()))
        .add_node(Stage::GraphTools.as_str(), GraphToolsNode::new(confirm, plotter))
        .add_node(Stage::End.as_str(), EndNode)
        .set_entry(Stage::Reasoning.as_str())
        .set_finish(Stage::End.as_str())
        .add_conditional_edge(
            Stage::Reasoning.as_str(),
            route,
            paths(&[Stage::HumanApproval, Stage::End, Stage::Reasoning]),
        )
        .add_conditional_edge(
            Stage::HumanApproval.as_str(),
            route,
            paths(&[Stage::GraphTools, Stage::Reasoning]),
        )
        .add_conditional_edge(Stage::GraphTools.as_str(), route, paths(&[Stage::End]))
        .with_config(ExecutionConfig::with_max_steps(config.max_steps))
        .build()
}

/// Runs one question through the workflow and returns the final state.
pub async fn run_workflow(
    graph: &ExecutableGraph<AgentState>,
    raw_query: impl Into<String>,
) -> Result<AgentState, GraphError> {
    let state = GraphState::new(AgentState::new(raw_query));
    graph.invoke(state).await.map(|state| state.data)
}
