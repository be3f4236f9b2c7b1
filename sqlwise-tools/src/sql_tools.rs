use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use sqlwise_core::Value;
use tracing::{error, info, warn};

use crate::database::{error_row, Rows, SqlDatabase};
use crate::error::ToolSetBuildError;
use crate::similarity::close_matches;
use crate::tooling::{ToolContext, ToolSet, TypedTool};

/// Minimum similarity ratio accepted by `find_similar_table`.
pub const SIMILARITY_CUTOFF: f64 = 0.6;

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListTablesArgs {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DescribeTableArgs {
    /// Name of the table to describe.
    pub table_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindSimilarTableArgs {
    /// Free-text hint such as 'customer name' or 'order date'.
    pub column_hint: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DbQueryArgs {
    /// SQL statement to execute.
    pub query: String,
}

#[derive(Clone)]
pub struct ListTablesTool {
    db: Arc<dyn SqlDatabase>,
}

impl ListTablesTool {
    pub fn new(db: Arc<dyn SqlDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl TypedTool for ListTablesTool {
    type Args = ListTablesArgs;
    type Output = Vec<String>;

    const NAME: &'static str = "list_tables";
    const DESCRIPTION: &'static str =
        "Lists all available tables in the database. Takes no arguments.";

    async fn run(&self, _args: Self::Args, ctx: ToolContext) -> Self::Output {
        info!(call_id = %ctx.call_id, "listing tables");
        match self.db.table_names().await {
            Ok(names) => names,
            Err(err) => {
                warn!(call_id = %ctx.call_id, error = %err, "could not list tables");
                Vec::new()
            }
        }
    }
}

#[derive(Clone)]
pub struct DescribeTableTool {
    db: Arc<dyn SqlDatabase>,
}

impl DescribeTableTool {
    pub fn new(db: Arc<dyn SqlDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl TypedTool for DescribeTableTool {
    type Args = DescribeTableArgs;
    type Output = Rows;

    const NAME: &'static str = "describe_table";
    const DESCRIPTION: &'static str = "Describes the schema (columns and their types) of a specific table. Requires a 'table_name' argument.";

    async fn run(&self, args: Self::Args, ctx: ToolContext) -> Self::Output {
        info!(call_id = %ctx.call_id, table = %args.table_name, "describing table");
        let columns = match self.db.table_columns(&args.table_name).await {
            Ok(columns) => columns,
            Err(err) => {
                warn!(table = %args.table_name, error = %err, "could not describe table");
                return error_row(err);
            }
        };

        if columns.is_empty() {
            return error_row(format!("no such table: {}", args.table_name));
        }

        columns
            .into_iter()
            .map(|(name, kind)| vec![Value::String(name), Value::String(kind)])
            .collect()
    }
}

#[derive(Clone)]
pub struct FindSimilarTableTool {
    db: Arc<dyn SqlDatabase>,
}

impl FindSimilarTableTool {
    pub fn new(db: Arc<dyn SqlDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl TypedTool for FindSimilarTableTool {
    type Args = FindSimilarTableArgs;
    type Output = String;

    const NAME: &'static str = "find_similar_table";
    const DESCRIPTION: &'static str = "Suggests table names that might contain a column similar to the provided hint. Requires a 'column_hint' argument (e.g., 'customer name', 'order date').";

    async fn run(&self, args: Self::Args, ctx: ToolContext) -> Self::Output {
        info!(call_id = %ctx.call_id, hint = %args.column_hint, "finding similar table");
        let tables = match self.db.table_names().await {
            Ok(tables) => tables,
            Err(err) => {
                warn!(error = %err, "could not list tables for similarity search");
                return String::new();
            }
        };

        let lowered: Vec<String> = tables.iter().map(|t| t.to_lowercase()).collect();
        let hint = args.column_hint.to_lowercase();
        close_matches(&hint, lowered.iter().map(String::as_str), 1, SIMILARITY_CUTOFF)
            .into_iter()
            .next()
            .unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct DbQueryTool {
    db: Arc<dyn SqlDatabase>,
}

impl DbQueryTool {
    pub fn new(db: Arc<dyn SqlDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl TypedTool for DbQueryTool {
    type Args = DbQueryArgs;
    type Output = Rows;

    const NAME: &'static str = "db_query_tool";
    const DESCRIPTION: &'static str = "Executes a given SQL query against the database and returns the results. Requires a 'query' argument containing the SQL string.";

    async fn run(&self, args: Self::Args, ctx: ToolContext) -> Self::Output {
        info!(call_id = %ctx.call_id, query = %args.query, "executing query");
        match self.db.run(&args.query).await {
            Ok(rows) => rows,
            Err(err) => {
                error!(call_id = %ctx.call_id, query = %args.query, error = %err, "query failed");
                error_row(err)
            }
        }
    }
}

/// The four SQL tools in declaration order, all sharing one store.
pub fn sql_toolset(db: Arc<dyn SqlDatabase>) -> Result<ToolSet, ToolSetBuildError> {
    ToolSet::new()
        .register_with(ListTablesTool::new(db.clone()))
        .register_with(DescribeTableTool::new(db.clone()))
        .register_with(FindSimilarTableTool::new(db.clone()))
        .register_with(DbQueryTool::new(db))
        .build()
}
