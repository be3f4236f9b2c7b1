use std::path::Path;

use sqlwise_core::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row as _, TypeInfo, ValueRef};
use tracing::{error, info, warn};

use crate::database::{Row, Rows, SqlDatabase};
use crate::error::DatabaseError;

/// What happened to the store file while opening it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The file already existed; nothing was run.
    Existing,
    /// The file was new and the script ran to completion.
    Bootstrapped,
    /// The file was new and the script was empty.
    EmptyScript,
    /// The file was new and there was no script to run.
    MissingScript,
    /// The file was new and the script failed; the store is left as is.
    ScriptFailed(String),
}

#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Connects to a `sqlite:` URL such as `sqlite::memory:`.
    pub async fn connect(url: &str) -> Result<Self, DatabaseError> {
        let pool = pool_options()
            .connect(url)
            .await
            .map_err(DatabaseError::Connection)?;
        Ok(Self { pool })
    }

    /// Opens the file at `path`, creating it when missing.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        let pool = pool_options()
            .connect_with(options)
            .await
            .map_err(DatabaseError::Connection)?;
        Ok(Self { pool })
    }

    /// Opens `db_path`, seeding it from `script_path` when the file is new.
    ///
    /// Script problems are logged and reported in the outcome; only failing
    /// to open the store itself is an error.
    pub async fn open_or_bootstrap(
        db_path: impl AsRef<Path>,
        script_path: impl AsRef<Path>,
    ) -> Result<(Self, BootstrapOutcome), DatabaseError> {
        let db_path = db_path.as_ref();
        let script_path = script_path.as_ref();
        let existed = tokio::fs::try_exists(db_path).await.unwrap_or(false);

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| DatabaseError::Bootstrap {
                    path: parent.display().to_string(),
                    source,
                })?;
        }

        let db = Self::open(db_path).await?;
        if existed {
            info!(path = %db_path.display(), "using existing database");
            return Ok((db, BootstrapOutcome::Existing));
        }

        if !tokio::fs::try_exists(script_path).await.unwrap_or(false) {
            warn!(
                path = %db_path.display(),
                script = %script_path.display(),
                "database created without a bootstrap script; it is empty"
            );
            return Ok((db, BootstrapOutcome::MissingScript));
        }

        let script = tokio::fs::read_to_string(script_path)
            .await
            .map_err(|source| DatabaseError::Bootstrap {
                path: script_path.display().to_string(),
                source,
            })?;

        if script.trim().is_empty() {
            warn!(script = %script_path.display(), "bootstrap script is empty; skipping");
            return Ok((db, BootstrapOutcome::EmptyScript));
        }

        let outcome = match db.execute_script(&script).await {
            Ok(()) => {
                info!(script = %script_path.display(), "database bootstrapped");
                BootstrapOutcome::Bootstrapped
            }
            Err(err) => {
                error!(script = %script_path.display(), error = %err, "bootstrap script failed");
                BootstrapOutcome::ScriptFailed(err.to_string())
            }
        };
        Ok((db, outcome))
    }

    /// Runs a multi-statement script.
    pub async fn execute_script(&self, script: &str) -> Result<(), DatabaseError> {
        sqlx::raw_sql(script)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn pool_options() -> SqlitePoolOptions {
    // A single long-lived connection keeps `sqlite::memory:` stores alive.
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
}

#[async_trait::async_trait]
impl SqlDatabase for SqliteDatabase {
    async fn table_names(&self) -> Result<Vec<String>, DatabaseError> {
        sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<(String, String)>, DatabaseError> {
        sqlx::query_as::<_, (String, String)>("SELECT name, type FROM pragma_table_info(?)")
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)
    }

    async fn run(&self, query: &str) -> Result<Rows, DatabaseError> {
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;
        rows.iter().map(row_to_json).collect()
    }
}

fn row_to_json(row: &SqliteRow) -> Result<Row, DatabaseError> {
    (0..row.len()).map(|index| cell_to_json(row, index)).collect()
}

fn cell_to_json(row: &SqliteRow, index: usize) -> Result<Value, DatabaseError> {
    let raw = row.try_get_raw(index).map_err(DatabaseError::Query)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let kind = raw.type_info().name().to_ascii_uppercase();
    let value = match kind.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => {
            Value::from(row.try_get::<i64, _>(index).map_err(DatabaseError::Query)?)
        }
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
            let number = row.try_get::<f64, _>(index).map_err(DatabaseError::Query)?;
            serde_json::Number::from_f64(number)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }
        "BLOB" => {
            let bytes = row.try_get::<Vec<u8>, _>(index).map_err(DatabaseError::Query)?;
            Value::String(hex::encode(bytes))
        }
        _ => Value::String(row.try_get::<String, _>(index).map_err(DatabaseError::Query)?),
    };
    Ok(value)
}
