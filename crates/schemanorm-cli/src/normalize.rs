//! # Normalize Subcommand
//!
//! Loads a schema and a value document, normalizes the value and prints the
//! result in the configured format.

use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use schemanorm_core::{NormalizeError, Value};
use schemanorm_schema::Schema;

use crate::config::CliConfig;
use crate::{load_document, parse_yaml, render, EXIT_ERROR, EXIT_INVALID, EXIT_OK};

/// Arguments for the normalize subcommand.
#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Schema file (JSON or YAML).
    #[arg(long, short)]
    pub schema: PathBuf,

    /// Value file (JSON or YAML). Read from stdin when omitted.
    pub value: Option<PathBuf>,
}

/// Execute the normalize subcommand, printing to stdout.
pub fn run_normalize(args: &NormalizeArgs, config: &CliConfig) -> Result<u8> {
    let value = match &args.value {
        Some(path) => load_document(path)?,
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("failed to read value from stdin")?;
            parse_yaml(&content).context("invalid value on stdin")?
        }
    };
    let stdout = std::io::stdout();
    normalize_to(args, &value, config, &mut stdout.lock())
}

/// Normalize `value` against the schema named in `args`, writing the result
/// to `out`. Returns the process exit code.
pub fn normalize_to(
    args: &NormalizeArgs,
    value: &Value,
    config: &CliConfig,
    out: &mut impl Write,
) -> Result<u8> {
    let schema_doc = load_document(&args.schema)?;
    let schema = match Schema::from_value(&schema_doc) {
        Ok(schema) => schema,
        Err(e) => {
            tracing::error!(schema = %args.schema.display(), "{e}");
            return Ok(EXIT_ERROR);
        }
    };
    tracing::debug!(schema = %args.schema.display(), schema_type = %schema.schema_type(), "schema loaded");

    match config.engine().normalize(value, &schema) {
        Ok(normalized) => {
            writeln!(out, "{}", render(&normalized, config)?)?;
            Ok(EXIT_OK)
        }
        Err(NormalizeError::Validation(e)) => {
            tracing::error!(path = %e.path(), "{}", e.message());
            Ok(EXIT_INVALID)
        }
        Err(NormalizeError::Schema(e)) => {
            tracing::error!(schema = %args.schema.display(), "{e}");
            Ok(EXIT_ERROR)
        }
    }
}
