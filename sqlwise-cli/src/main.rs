mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sqlwise_agent::{
    build_workflow, run_workflow, ConfirmationProvider, HtmlChartPlotter, Plotter,
    StdinConfirmation,
};
use sqlwise_tools::{sql_toolset, BootstrapOutcome, SqlDatabase, SqliteDatabase};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!(config = ?cli, "starting");

    let (db, outcome) = SqliteDatabase::open_or_bootstrap(&cli.database, &cli.bootstrap_sql)
        .await
        .with_context(|| format!("failed to open database {}", cli.database.display()))?;
    if let BootstrapOutcome::ScriptFailed(reason) = &outcome {
        warn!(%reason, "continuing with a partially populated database");
    }
    let db: Arc<dyn SqlDatabase> = Arc::new(db);
    let tools = sql_toolset(db).context("failed to register tools")?;

    let llm = cli.build_llm()?;
    let confirm: Arc<dyn ConfirmationProvider> = Arc::new(StdinConfirmation);
    let plotter: Arc<dyn Plotter> = Arc::new(HtmlChartPlotter::new(
        llm.clone(),
        cli.model(),
        cli.chart_dir.clone(),
    ));
    let graph = build_workflow(llm, tools, confirm, plotter, &cli.agent_config())
        .context("failed to build the workflow")?;

    println!("\nRaw query: {}\n", cli.question);
    let final_state = run_workflow(&graph, cli.question.clone())
        .await
        .context("workflow stopped")?;

    println!("\nExecution completed.");
    if let Some(result) = final_state.result {
        println!("\nFinal result:\n{result}");
    }
    Ok(())
}
