use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use serde_json::Value;
use sqlwise_core::{LlmRequest, Message, ToolCallingLlm};
use tracing::{debug, info};

use crate::prompt::plot_prompt;
use crate::PlotError;

pub const NO_DATA_MESSAGE: &str = "There is no data to graph.";

const PREVIEW_ROWS: usize = 10;
const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Renders an approved result as a chart and returns a message for the user.
#[async_trait::async_trait]
pub trait Plotter: Send + Sync {
    async fn plot(&self, result: &str) -> Result<String, PlotError>;
}

/// Asks the completion service for a Plotly figure and writes it out as a
/// standalone HTML page.
#[derive(Clone)]
pub struct HtmlChartPlotter {
    llm: Arc<dyn ToolCallingLlm>,
    model: String,
    out_dir: PathBuf,
}

impl HtmlChartPlotter {
    pub fn new(
        llm: Arc<dyn ToolCallingLlm>,
        model: impl Into<String>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            out_dir: out_dir.into(),
        }
    }

    async fn write_page(&self, figure: &Value) -> Result<PathBuf, PlotError> {
        let write_err = |path: &Path, source| PlotError::Write {
            path: path.display().to_string(),
            source,
        };

        tokio::fs::create_dir_all(&self.out_dir)
            .await
            .map_err(|source| write_err(self.out_dir.as_path(), source))?;

        let stamp = Local::now().format("%Y%m%d-%H%M%S%3f");
        let path = self.out_dir.join(format!("chart-{stamp}.html"));
        tokio::fs::write(&path, render_page(figure))
            .await
            .map_err(|source| write_err(path.as_path(), source))?;
        Ok(path)
    }
}

impl std::fmt::Debug for HtmlChartPlotter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlChartPlotter")
            .field("model", &self.model)
            .field("out_dir", &self.out_dir)
            .finish()
    }
}

#[async_trait::async_trait]
impl Plotter for HtmlChartPlotter {
    async fn plot(&self, result: &str) -> Result<String, PlotError> {
        if result.trim().is_empty() {
            return Ok(NO_DATA_MESSAGE.to_string());
        }

        let preview = data_preview(result);
        info!(preview = %preview, "requesting chart");
        let request = LlmRequest {
            model: self.model.clone(),
            messages: vec![Message::user(plot_prompt(&preview)?)],
            tools: Vec::new(),
        };
        let response = self.llm.invoke(request).await?;
        debug!(content = %response.content, "chart description");

        let figure = parse_figure(&response.content)?;
        let path = self.write_page(&figure).await?;
        info!(path = %path.display(), "chart written");
        Ok(format!("Chart written to {}", path.display()))
    }
}

/// Tabular results become a CSV preview with `col_<n>` headers; anything
/// else is passed through as text.
pub(crate) fn data_preview(result: &str) -> String {
    let trimmed = result.trim();
    let Ok(Value::Array(rows)) = serde_json::from_str::<Value>(trimmed) else {
        return trimmed.to_string();
    };

    let rows: Option<Vec<&Vec<Value>>> = rows.iter().map(Value::as_array).collect();
    let Some(rows) = rows else {
        return trimmed.to_string();
    };
    let Some(width) = rows.first().map(|row| row.len()).filter(|width| *width > 0) else {
        return "Empty tabular data provided.".to_string();
    };

    let header = (0..width)
        .map(|i| format!("col_{i}"))
        .collect::<Vec<_>>()
        .join(",");
    let body = rows
        .iter()
        .take(PREVIEW_ROWS)
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>().join(","))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{header}\n{body}")
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Parses the model's figure, tolerating a surrounding markdown code fence.
pub(crate) fn parse_figure(content: &str) -> Result<Value, PlotError> {
    let body = strip_code_fence(content);
    let figure: Value = serde_json::from_str(body)
        .map_err(|err| PlotError::InvalidFigure(format!("not JSON: {err}")))?;

    match figure.get("data") {
        Some(Value::Array(traces)) if !traces.is_empty() => Ok(figure),
        _ => Err(PlotError::InvalidFigure(
            "expected an object with a non-empty \"data\" array".to_string(),
        )),
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest
        .split_once('\n')
        .map(|(_, body)| body)
        .unwrap_or(rest);
    rest.trim_end().trim_end_matches("```").trim()
}

fn render_page(figure: &Value) -> String {
    // `</` would end the script element early.
    let figure = figure.to_string().replace("</", "<\\/");
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>sqlwise chart</title>
<script src="{PLOTLY_CDN}"></script>
</head>
<body>
<div id="chart" style="width:100%;height:90vh;"></div>
<script>
const figure = {figure};
Plotly.newPlot("chart", figure.data, figure.layout || {{}});
</script>
</body>
</html>
"#
    )
}
