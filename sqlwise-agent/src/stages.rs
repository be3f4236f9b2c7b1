use std::sync::Arc;

use sqlwise_core::SqlwiseError;
use sqlwise_graph::{GraphNode, GraphState, StateUpdate};
use tracing::{error, info};

use crate::{AgentState, ConfirmError, ConfirmationProvider, Plotter, Stage};

pub const APPROVAL_QUESTION: &str = "Is the data correct? (y/n)";
pub const PLOT_QUESTION: &str = "Would you like to generate a graph? (y/n)";

fn interaction(context: &str, err: ConfirmError) -> SqlwiseError {
    SqlwiseError::Interaction {
        context: context.to_string(),
        source: Box::new(err),
    }
}

/// Shows the hand-off result and asks whether it is correct.
pub struct HumanApprovalNode {
    confirm: Arc<dyn ConfirmationProvider>,
}

impl HumanApprovalNode {
    pub fn new(confirm: Arc<dyn ConfirmationProvider>) -> Self {
        Self { confirm }
    }
}

#[async_trait::async_trait]
impl GraphNode<AgentState> for HumanApprovalNode {
    async fn invoke(
        &self,
        input: GraphState<AgentState>,
    ) -> Result<StateUpdate<AgentState>, SqlwiseError> {
        let mut state = input.data.without_route();
        info!("awaiting human approval");
        self.confirm
            .present(&format!("Results: {}", state.result.as_deref().unwrap_or_default()));

        let approved = self
            .confirm
            .confirm(APPROVAL_QUESTION)
            .await
            .map_err(|err| interaction("approval prompt", err))?;
        info!(approved, "approval answered");

        state.approved = approved;
        state.next = Some(if approved {
            Stage::GraphTools
        } else {
            Stage::Reasoning
        });
        Ok(StateUpdate::new(state))
    }
}

/// Offers to chart the approved result; always routes to `End`.
pub struct GraphToolsNode {
    confirm: Arc<dyn ConfirmationProvider>,
    plotter: Arc<dyn Plotter>,
}

impl GraphToolsNode {
    pub fn new(confirm: Arc<dyn ConfirmationProvider>, plotter: Arc<dyn Plotter>) -> Self {
        Self { confirm, plotter }
    }
}

#[async_trait::async_trait]
impl GraphNode<AgentState> for GraphToolsNode {
    async fn invoke(
        &self,
        input: GraphState<AgentState>,
    ) -> Result<StateUpdate<AgentState>, SqlwiseError> {
        let mut state = input.data.without_route();
        let plot = self
            .confirm
            .confirm(PLOT_QUESTION)
            .await
            .map_err(|err| interaction("plot prompt", err))?;
        state.plot_confirm = plot;

        if plot {
            let result = state.result.clone().unwrap_or_default();
            match self.plotter.plot(&result).await {
                Ok(message) => self.confirm.present(&message),
                Err(err) => {
                    error!(error = %err, "chart generation failed");
                    self.confirm
                        .present(&format!("⚠️ Error generating chart: {err}"));
                }
            }
        }

        state.next = Some(Stage::End);
        Ok(StateUpdate::new(state))
    }
}

/// Terminal pass-through.
#[derive(Clone, Copy, Debug, Default)]
pub struct EndNode;

#[async_trait::async_trait]
impl GraphNode<AgentState> for EndNode {
    async fn invoke(
        &self,
        input: GraphState<AgentState>,
    ) -> Result<StateUpdate<AgentState>, SqlwiseError> {
        Ok(StateUpdate::new(input.data))
    }
}
