// crates/ecfr-dashboard-cli/src/main.rs
// ============================================================================
// Module: eCFR Dashboard CLI Entry Point
// Description: Command dispatcher for serving, config checks, metrics, ingest.
// Purpose: Single binary for operating the dashboard locally.
// Dependencies: clap, ecfr-dashboard-api, ecfr-dashboard-config, tokio, time
// ============================================================================

//! ## Overview
//! `ecfr-dashboard` runs the HTTP server, validates or prints configuration,
//! prints the metrics report as JSON, and ingests local eCFR exports into a
//! `SQLite` database. Store access is blocking and always runs on Tokio's
//! blocking pool.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use ecfr_dashboard_api::DashboardServer;
use ecfr_dashboard_api::build_dashboard_store;
use ecfr_dashboard_cli::IngestSources;
use ecfr_dashboard_cli::run_ingest;
use ecfr_dashboard_config::DashboardConfig;
use ecfr_dashboard_config::config_toml_example;
use ecfr_dashboard_core::DashboardStore;
use ecfr_dashboard_core::MetricsReport;
use ecfr_dashboard_store_sqlite::SqliteStoreConfig;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "ecfr-dashboard", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the dashboard HTTP server.
    Serve(ConfigArgs),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Print the metrics report as JSON.
    Metrics(ConfigArgs),
    /// Ingest local eCFR exports into a `SQLite` database.
    Ingest(IngestCommand),
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a dashboard configuration file.
    Validate(ConfigArgs),
    /// Print a canonical example configuration.
    Example,
}

/// Shared `--config` argument.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Optional config file path (defaults to ecfr-dashboard.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `ingest`.
#[derive(Args, Debug)]
struct IngestCommand {
    /// Agency directory export (`{"agencies": [...]}`).
    #[arg(long, value_name = "PATH")]
    agencies: PathBuf,
    /// Title catalog export (`{"titles": [...]}`).
    #[arg(long, value_name = "PATH")]
    titles: PathBuf,
    /// Directory holding `title-<n>.json` structure exports.
    #[arg(long, value_name = "DIR")]
    structures: PathBuf,
    /// `SQLite` database to create or update.
    #[arg(long, value_name = "PATH", default_value = "ecfr_analysis.db")]
    db: PathBuf,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => command_serve(args).await,
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Metrics(args) => command_metrics(args).await,
        Commands::Ingest(command) => command_ingest(command).await,
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(args: ConfigArgs) -> CliResult<ExitCode> {
    let config = DashboardConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let server = tokio::task::spawn_blocking(move || DashboardServer::from_config(&config))
        .await
        .map_err(|err| CliError::new(format!("server init failed: init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    write_stderr_line(&format!("ecfr-dashboard listening on http://{}", server.bind_addr()))
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(args) => {
            DashboardConfig::load(args.config.as_deref())
                .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
            write_stdout_line("config ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
        ConfigCommand::Example => {
            write_stdout_line(config_toml_example().trim_end())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `metrics` command.
async fn command_metrics(args: ConfigArgs) -> CliResult<ExitCode> {
    let config = DashboardConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let report = tokio::task::spawn_blocking(move || -> Result<MetricsReport, String> {
        let store = build_dashboard_store(&config.store).map_err(|err| err.to_string())?;
        store.metrics_report().map_err(|err| err.to_string())
    })
    .await
    .map_err(|err| CliError::new(format!("metrics failed: join failed: {err}")))?
    .map_err(|err| CliError::new(format!("metrics failed: {err}")))?;
    let json = serde_json::to_string_pretty(&report)
        .map_err(|err| CliError::new(format!("metrics serialization failed: {err}")))?;
    write_stdout_line(&json).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `ingest` command.
async fn command_ingest(command: IngestCommand) -> CliResult<ExitCode> {
    let today = time::OffsetDateTime::now_utc().date().to_string();
    let database = SqliteStoreConfig::new(command.db.clone());
    let sources = IngestSources {
        agencies: command.agencies,
        titles: command.titles,
        structures: command.structures,
    };
    let summary = tokio::task::spawn_blocking(move || run_ingest(&sources, &database, &today))
        .await
        .map_err(|err| CliError::new(format!("ingest failed: join failed: {err}")))?
        .map_err(|err| CliError::new(format!("ingest failed: {err}")))?;
    write_stdout_line(&format!(
        "ingested {} agencies and {} reference errors into {} ({} titles indexed, {} without \
         structure)",
        summary.written.agencies,
        summary.written.errors,
        command.db.display(),
        summary.titles_indexed,
        summary.titles_missing,
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
