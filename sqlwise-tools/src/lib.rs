//! Tool registry and the SQL tools exposed to the reasoning loop.
//!
//! Tools report backing-store failures as data (empty lists, error rows)
//! rather than through `Err`, so the loop can hand them back to the model
//! as ordinary tool output.

mod database;
mod error;
pub mod similarity;
mod sql_tools;
mod sqlite;
mod tooling;

pub use database::{error_row, Row, Rows, SqlDatabase, ERROR_MARKER};
pub use error::{DatabaseError, ToolDispatchError, ToolSetBuildError};
pub use sql_tools::{
    sql_toolset, DbQueryArgs, DbQueryTool, DescribeTableArgs, DescribeTableTool,
    FindSimilarTableArgs, FindSimilarTableTool, ListTablesArgs, ListTablesTool,
    SIMILARITY_CUTOFF,
};
pub use sqlite::{BootstrapOutcome, SqliteDatabase};
pub use tooling::{ToolContext, ToolSet, ToolSetBuilder, TypedTool};
