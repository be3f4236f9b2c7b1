use std::sync::Arc;

use serde_json::{Map, Value};
use sqlwise_core::{
    normalize, LlmRequest, Message, NormalizeError, Role, SqlwiseError, ToolCallingLlm,
    ToolInvocation,
};
use sqlwise_graph::{GraphNode, GraphState, StateUpdate};
use sqlwise_tools::{ToolContext, ToolDispatchError, ToolSet};
use tracing::{debug, error, info, warn};

use crate::prompt::{instruction_prompt, REFUSAL};
use crate::{AgentState, Stage};

pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

pub const MALFORMED_CALL_MESSAGE: &str =
    "Error: The AI tried to use a tool in an invalid way. Please try rephrasing your request.";

pub const LLM_FAILURE_PREFIX: &str = "Error: the language model request failed: ";

pub fn exhausted_message(max_iterations: u32) -> String {
    format!("Error: AI reached maximum thinking steps ({max_iterations}) without a conclusion.")
}

/// The bounded completion/tool-dispatch loop.
///
/// Produces either a hand-off result (`next = HumanApproval`) or a terminal
/// one (`next = End`). A response whose role is not `Assistant` sends the
/// workflow back into this node; the rounds spent so far are carried in
/// [`AgentState::reasoning_rounds`] so re-entry shares the same bound.
pub struct ReasoningNode {
    llm: Arc<dyn ToolCallingLlm>,
    tools: ToolSet,
    model: String,
    max_iterations: u32,
}

pub struct ReasoningNodeBuilder {
    llm: Option<Arc<dyn ToolCallingLlm>>,
    tools: Option<ToolSet>,
    model: String,
    max_iterations: u32,
}

impl ReasoningNode {
    pub fn builder() -> ReasoningNodeBuilder {
        ReasoningNodeBuilder {
            llm: None,
            tools: None,
            model: String::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    async fn table_names(&self) -> Vec<String> {
        let invocation = ToolInvocation {
            name: "list_tables".to_string(),
            arguments: Map::new(),
            call_id: "initial_list_tables".to_string(),
            error: None,
        };
        let ctx = ToolContext {
            call_id: invocation.call_id.clone(),
        };
        match self.tools.dispatch(&invocation, ctx).await {
            Ok(value) => serde_json::from_value(value).unwrap_or_else(|err| {
                warn!(error = %err, "list_tables returned an unexpected shape");
                Vec::new()
            }),
            Err(err) => {
                warn!(error = %err, "could not list tables for the prompt");
                Vec::new()
            }
        }
    }

    /// Turns one tool-call request into the tool-result entry that answers it.
    async fn answer_call(
        &self,
        request: Result<ToolInvocation, NormalizeError>,
    ) -> Message {
        let invocation = match request {
            Ok(invocation) => invocation,
            Err(err) => {
                error!(error = %err, "skipping unusable tool call");
                return Message::tool(err.call_id(), format!("⚠️ Error: {err}"));
            }
        };

        if let Some(detail) = &invocation.error {
            error!(tool = %invocation.name, args = ?invocation.arguments, error = %detail, "invalid tool call from model");
            return Message::tool(
                invocation.call_id,
                format!("⚠️ Error: Invalid tool call from LLM - {detail}"),
            );
        }

        info!(tool = %invocation.name, args = ?invocation.arguments, "running tool");
        let ctx = ToolContext {
            call_id: invocation.call_id.clone(),
        };
        let content = match self.tools.dispatch(&invocation, ctx).await {
            Ok(output) => output.to_string(),
            Err(ToolDispatchError::UnknownTool { name, .. }) => {
                warn!(tool = %name, "model asked for an unknown tool");
                Value::String(format!("⚠️ Unknown tool: {name}")).to_string()
            }
            Err(err) => {
                error!(tool = %invocation.name, error = %err, "tool failed");
                format!("⚠️ Error: {err}")
            }
        };
        Message::tool(invocation.call_id, content)
    }
}

impl ReasoningNodeBuilder {
    pub fn llm(mut self, llm: Arc<dyn ToolCallingLlm>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn tools(mut self, tools: ToolSet) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn build(self) -> Result<ReasoningNode, SqlwiseError> {
        let llm = self
            .llm
            .ok_or_else(|| SqlwiseError::InvalidConfig("reasoning node needs an llm".to_string()))?;
        let tools = self
            .tools
            .ok_or_else(|| SqlwiseError::InvalidConfig("reasoning node needs tools".to_string()))?;
        if self.max_iterations == 0 {
            return Err(SqlwiseError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(ReasoningNode {
            llm,
            tools,
            model: self.model,
            max_iterations: self.max_iterations,
        })
    }
}

fn conclude(mut state: AgentState, result: impl Into<String>, next: Stage) -> StateUpdate<AgentState> {
    state.result = Some(result.into());
    state.next = Some(next);
    state.reasoning_rounds = 0;
    StateUpdate::new(state)
}

#[async_trait::async_trait]
impl GraphNode<AgentState> for ReasoningNode {
    async fn invoke(
        &self,
        input: GraphState<AgentState>,
    ) -> Result<StateUpdate<AgentState>, SqlwiseError> {
        let mut state = input.data.without_route();
        info!(query = %state.raw_query, "starting reasoning");

        let tables = self.table_names().await;
        let mut history = vec![Message::user(instruction_prompt(&state.raw_query, &tables)?)];
        let mut iterations = state.reasoning_rounds;

        while iterations < self.max_iterations {
            iterations += 1;
            info!(iteration = iterations, max = self.max_iterations, "reasoning iteration");

            let request = LlmRequest {
                model: self.model.clone(),
                messages: history.clone(),
                tools: self.tools.specs().to_vec(),
            };
            let response = match self.llm.invoke(request).await {
                Ok(response) => response,
                Err(err) => {
                    error!(error = %err, "completion request failed");
                    return Ok(conclude(state, format!("{LLM_FAILURE_PREFIX}{err}"), Stage::End));
                }
            };
            debug!(?response, "completion response");

            if response.is_malformed_call() {
                error!("model returned a malformed function call; aborting");
                return Ok(conclude(state, MALFORMED_CALL_MESSAGE, Stage::End));
            }

            if response.role != Role::Assistant {
                warn!(role = ?response.role, "unexpected response from the model; re-entering reasoning");
                state.reasoning_rounds = iterations;
                state.next = Some(Stage::Reasoning);
                return Ok(StateUpdate::new(state));
            }

            info!(content = %response.content, "model response");
            if response.tool_calls.is_empty() && !response.content.is_empty() {
                let next = if response.content.trim() == REFUSAL {
                    Stage::End
                } else {
                    Stage::HumanApproval
                };
                return Ok(conclude(state, response.content, next));
            }

            let requests: Vec<Result<ToolInvocation, NormalizeError>> =
                response.tool_calls.iter().map(normalize).collect();
            let issued = requests
                .iter()
                .filter_map(|request| request.as_ref().ok())
                .map(ToolInvocation::to_tool_call)
                .collect();
            history.push(Message::assistant(response.content, issued));

            for request in requests {
                let answer = self.answer_call(request).await;
                history.push(answer);
            }
        }

        warn!(max = self.max_iterations, "reasoning iterations exhausted");
        Ok(conclude(state, exhausted_message(self.max_iterations), Stage::End))
    }
}
