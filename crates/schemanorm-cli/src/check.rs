//! # Check-Schema Subcommand
//!
//! Parses schema files and reports configuration errors without
//! normalizing anything.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use schemanorm_schema::Schema;

use crate::{load_document, EXIT_ERROR, EXIT_OK};

/// Arguments for the check-schema subcommand.
#[derive(Args, Debug)]
pub struct CheckSchemaArgs {
    /// Schema files (JSON or YAML).
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Execute the check-schema subcommand, printing to stdout.
pub fn run_check_schema(args: &CheckSchemaArgs) -> Result<u8> {
    let stdout = std::io::stdout();
    check_to(args, &mut stdout.lock())
}

/// Check every file, writing one `OK`/`FAIL` line per file to `out`.
/// Unreadable files count as failures; checking continues with the rest.
pub fn check_to(args: &CheckSchemaArgs, out: &mut impl Write) -> Result<u8> {
    let mut failures = 0usize;
    for path in &args.files {
        let outcome = load_document(path).and_then(|doc| Schema::from_value(&doc).map_err(Into::into));
        match outcome {
            Ok(schema) => {
                writeln!(out, "OK   {} ({})", path.display(), schema.schema_type())?;
            }
            Err(e) => {
                failures += 1;
                tracing::error!(file = %path.display(), "{e:#}");
                writeln!(out, "FAIL {}: {e:#}", path.display())?;
            }
        }
    }
    tracing::info!(checked = args.files.len(), failures, "schema check finished");
    Ok(if failures == 0 { EXIT_OK } else { EXIT_ERROR })
}
