//! The SQL question-answering workflow: a bounded reasoning loop over the
//! SQL tools, followed by human approval and an optional chart.

mod confirm;
mod error;
mod plot;
pub mod prompt;
mod reasoning;
mod stages;
mod state;
mod workflow;

pub use confirm::{is_affirmative, ConfirmationProvider, ScriptedConfirmation, StdinConfirmation};
pub use error::{ConfirmError, PlotError};
pub use plot::{HtmlChartPlotter, Plotter, NO_DATA_MESSAGE};
pub use reasoning::{
    exhausted_message, ReasoningNode, DEFAULT_MAX_ITERATIONS, LLM_FAILURE_PREFIX,
    MALFORMED_CALL_MESSAGE,
};
pub use stages::{
    EndNode, GraphToolsNode, HumanApprovalNode, APPROVAL_QUESTION, PLOT_QUESTION,
};
pub use state::{AgentState, Stage};
pub use workflow::{build_workflow, run_workflow, AgentConfig};
