//! Prompt templates. Placeholders are written `{{ name }}`; rendering fails
//! when a placeholder has no value.

use std::collections::HashMap;

use regex::Regex;
use sqlwise_core::SqlwiseError;

/// Exact answer the model gives for questions unrelated to the database.
pub const REFUSAL: &str = "I am a SQL agent designed to answer queries about the database.";

const INSTRUCTIONS: &str = r#"
You are a helpful SQL assistant that translates natural language questions into optimized SQL queries for a SQLite database.
Question: {{ raw_query }}
Tables: {{ tables }}
You have access to the following tools. Use them by providing arguments exactly as specified in the JSON format:
- list_tables: Returns the names of all tables. Takes no arguments.
- describe_table: Given a table name, returns its schema. Call with arguments like: {"table_name": "ACTUAL_TABLE_NAME"}
- db_query_tool: Executes SQL queries and returns results. Call with arguments like: {"query": "YOUR_SQL_QUERY"}
- find_similar_table: Given a column hint (e.g. 'country', 'name'), suggests which tables might contain that column. Call with arguments like: {"column_hint": "YOUR_COLUMN_HINT"}
When generating SQL queries, always:
1. Use list_tables() if you're unsure of the table name.
2. Use describe_table() to understand the schema of a table.
3. Use find_similar_table() if you are not sure where a column (e.g., 'country') is stored.
4. Write optimized SQL and avoid SELECT * unless necessary.
5. Use GROUP BY and aggregations (COUNT, AVG, SUM, etc.) when appropriate.
6. Format output in a readable way.
Think step by step and use these tools to clarify the structure before querying.
If the question does not refer to any of the tables ({{ tables }}) in the database, answer exactly: {{ refusal }}
"#;

const PLOT_INSTRUCTIONS: &str = r#"
I have this data:
{{ data }}

Describe a Plotly chart that visualizes it. Reply with a single JSON object of
the form {"data": [...traces...], "layout": {...}} that can be passed directly
to Plotly.newPlot. Use a bar chart for categorical counts, a line chart for
ordered series, and an "indicator" trace for a single number. Include axis
titles. Reply with the JSON object only, without explanations or markdown.
"#;

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn render(&self, vars: &HashMap<&str, String>) -> Result<String, SqlwiseError> {
        let pattern = Regex::new(r"\{\{\s*(\w+)\s*\}\}")
            .map_err(|e| SqlwiseError::InvalidConfig(e.to_string()))?;

        if let Some(missing) = pattern
            .captures_iter(&self.template)
            .map(|caps| caps[1].to_string())
            .find(|key| !vars.contains_key(key.as_str()))
        {
            return Err(SqlwiseError::InvalidConfig(format!(
                "prompt variable '{missing}' has no value"
            )));
        }

        let rendered = pattern.replace_all(&self.template, |caps: &regex::Captures| {
            vars.get(&caps[1]).cloned().unwrap_or_default()
        });
        Ok(rendered.into_owned())
    }
}

/// The opening user message of a reasoning session.
pub fn instruction_prompt(raw_query: &str, tables: &[String]) -> Result<String, SqlwiseError> {
    let vars = HashMap::from([
        ("raw_query", raw_query.to_string()),
        ("tables", tables.join(", ")),
        ("refusal", REFUSAL.to_string()),
    ]);
    PromptTemplate::new(INSTRUCTIONS).render(&vars)
}

pub fn plot_prompt(data_preview: &str) -> Result<String, SqlwiseError> {
    let vars = HashMap::from([("data", data_preview.to_string())]);
    PromptTemplate::new(PLOT_INSTRUCTIONS).render(&vars)
}
