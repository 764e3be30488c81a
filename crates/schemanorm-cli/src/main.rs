//! # schemanorm CLI entry point
//!
//! Parses command-line arguments and dispatches to the subcommand handlers.
//! Only `normalize` reads the configuration file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use schemanorm_cli::check::{run_check_schema, CheckSchemaArgs};
use schemanorm_cli::config::CliConfig;
use schemanorm_cli::normalize::{run_normalize, NormalizeArgs};
use schemanorm_cli::EXIT_ERROR;

/// Schema-driven value normalization.
///
/// Checks JSON and YAML documents against declarative schemas and prints
/// their canonical form.
#[derive(Parser, Debug)]
#[command(name = "schemanorm", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file. Defaults to $SCHEMANORM_CONFIG.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalize a value document against a schema.
    Normalize(NormalizeArgs),

    /// Check schema files for configuration errors.
    CheckSchema(CheckSchemaArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("schemanorm CLI v{} starting", env!("CARGO_PKG_VERSION"));

    match dispatch(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn dispatch(cli: &Cli) -> anyhow::Result<u8> {
    match &cli.command {
        Commands::Normalize(args) => {
            let config = CliConfig::load(cli.config.as_deref())?;
            run_normalize(args, &config)
        }
        Commands::CheckSchema(args) => run_check_schema(args),
    }
}
