use rustyline::error::ReadlineError;
use sqlwise_core::SqlwiseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("input closed before the question was answered")]
    Closed,
    #[error("confirmation interrupted")]
    Interrupted,
    #[error("failed to read confirmation: {0}")]
    Readline(#[source] ReadlineError),
    #[error("confirmation task failed: {0}")]
    Join(String),
}

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("chart request failed: {0}")]
    Llm(#[from] SqlwiseError),
    #[error("chart description is not a usable figure: {0}")]
    InvalidFigure(String),
    #[error("failed to write chart {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
