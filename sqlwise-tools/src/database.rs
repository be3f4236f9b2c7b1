use std::fmt::Display;

use sqlwise_core::Value;

use crate::DatabaseError;

pub type Row = Vec<Value>;
pub type Rows = Vec<Row>;

/// Prefix carried by every synthetic error row.
pub const ERROR_MARKER: &str = "⚠️ Error:";

/// The single-row, single-column payload used to report a failure as data.
pub fn error_row(message: impl Display) -> Rows {
    vec![vec![Value::String(format!("{ERROR_MARKER} {message}"))]]
}

/// Query-execution service backing the SQL tools.
#[async_trait::async_trait]
pub trait SqlDatabase: Send + Sync {
    /// Names of the user tables, in store order.
    async fn table_names(&self) -> Result<Vec<String>, DatabaseError>;

    /// `(column_name, column_type)` pairs; empty when the table does not exist.
    async fn table_columns(&self, table: &str) -> Result<Vec<(String, String)>, DatabaseError>;

    async fn run(&self, query: &str) -> Result<Rows, DatabaseError>;
}
