//! druid-worker — runs a single Druid query task described as JSON.
//!
//! Reads a task spec (`{"task": "...", "params": {...}}`) from a file or
//! stdin, executes it against the configured Druid endpoints, and prints
//! the result JSON to stdout. Connection defaults come from `DRUID_*`
//! environment variables; the spec's parameters override them per field.

use std::io::Read;

use clap::Parser;
use tracing::info;

use druidflow_tasks::{DruidNativeConfig, DruidSqlConfig, NativeQueryParams, SqlTaskParams, TaskSpec};

// ── CLI ─────────────────────────────────────────────────────────────

/// Druid query worker — executes one task spec and prints the result.
#[derive(Parser, Debug)]
#[command(name = "druid-worker", version, about)]
struct Cli {
    /// Path to a task spec JSON file. Reads stdin when omitted.
    #[arg(long, env = "DRUID_TASK_SPEC")]
    spec: Option<String>,

    /// Pretty-print the result JSON.
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let raw = match &cli.spec {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let spec: TaskSpec = serde_json::from_str(&raw)?;

    let sql_defaults = SqlTaskParams::from_config(&DruidSqlConfig::from_env());
    let native_defaults = NativeQueryParams::from_config(&DruidNativeConfig::from_env());

    info!(task = spec.kind(), "executing task");
    let result = spec.run(sql_defaults, native_defaults).await?;

    if cli.pretty {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", serde_json::to_string(&result)?);
    }

    Ok(())
}
