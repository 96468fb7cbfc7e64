// crates/ecfr-dashboard-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Argument Tests
// Description: Unit tests for command-line parsing.
// Purpose: Keep subcommand names and flags stable.
// Dependencies: clap
// ============================================================================

//! ## Overview
//! Parses representative command lines through the clap definitions.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::use_debug,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::path::PathBuf;

use clap::Parser;

use super::Cli;
use super::Commands;
use super::ConfigCommand;

#[test]
fn serve_accepts_config_path() {
    let cli = Cli::try_parse_from(["ecfr-dashboard", "serve", "--config", "dash.toml"]).unwrap();
    match cli.command {
        Commands::Serve(args) => assert_eq!(args.config, Some(PathBuf::from("dash.toml"))),
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn config_example_takes_no_arguments() {
    let cli = Cli::try_parse_from(["ecfr-dashboard", "config", "example"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Config {
            command: ConfigCommand::Example
        }
    ));
}

#[test]
fn ingest_defaults_database_path() {
    let cli = Cli::try_parse_from([
        "ecfr-dashboard",
        "ingest",
        "--agencies",
        "agencies.json",
        "--titles",
        "titles.json",
        "--structures",
        "structures",
    ])
    .unwrap();
    match cli.command {
        Commands::Ingest(command) => {
            assert_eq!(command.db, PathBuf::from("ecfr_analysis.db"));
            assert_eq!(command.structures, PathBuf::from("structures"));
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn ingest_requires_sources() {
    assert!(Cli::try_parse_from(["ecfr-dashboard", "ingest", "--agencies", "a.json"]).is_err());
}
