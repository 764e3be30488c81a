//! # schemanorm-cli: Command-Line Front End
//!
//! Provides the `schemanorm` binary.
//!
//! ## Subcommands
//!
//! - `schemanorm normalize`: normalize one value document against a schema.
//! - `schemanorm check-schema`: report configuration errors in schema files.
//!
//! ```bash
//! schemanorm normalize --schema form.yaml value.json
//! cat value.yaml | schemanorm -v normalize --schema form.yaml
//! schemanorm check-schema schemas/*.yaml
//! ```
//!
//! ## Exit Codes
//!
//! | Code | Meaning |
//! |---|---|
//! | 0 | success |
//! | 1 | the value failed validation |
//! | 2 | a schema configuration error, or an I/O or parse failure |

pub mod check;
pub mod config;
pub mod normalize;

use std::path::Path;

use anyhow::{Context, Result};

use schemanorm_core::Value;

use crate::config::{CliConfig, OutputFormat};

/// Exit code for success.
pub const EXIT_OK: u8 = 0;
/// Exit code for a value that failed validation.
pub const EXIT_INVALID: u8 = 1;
/// Exit code for schema configuration, I/O and parse failures.
pub const EXIT_ERROR: u8 = 2;

/// Read a JSON or YAML document. Files ending in `.json` are parsed as
/// JSON; everything else as YAML.
pub fn load_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
    } else {
        parse_yaml(&content).with_context(|| format!("invalid YAML in {}", path.display()))
    }
}

/// Parse YAML (and therefore JSON) text into a [`Value`].
pub fn parse_yaml(content: &str) -> Result<Value> {
    Ok(serde_yaml::from_str(content)?)
}

/// Render a value in the configured output format.
pub fn render(value: &Value, config: &CliConfig) -> Result<String> {
    let text = match (config.output, config.pretty) {
        (OutputFormat::Json, true) => serde_json::to_string_pretty(value)?,
        (OutputFormat::Json, false) => serde_json::to_string(value)?,
        (OutputFormat::Yaml, _) => serde_yaml::to_string(value)?,
    };
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_document_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("v.json");
        let yaml = dir.path().join("v.yaml");
        std::fs::write(&json, r#"{"a": [1, 2.5]}"#).unwrap();
        std::fs::write(&yaml, "a:\n  - 1\n  - 2.5\n").unwrap();
        assert_eq!(load_document(&json).unwrap(), load_document(&yaml).unwrap());
    }

    #[test]
    fn load_document_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        let err = load_document(&missing).unwrap_err();
        assert!(format!("{err:#}").contains("missing.yaml"));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{").unwrap();
        assert!(format!("{:#}", load_document(&bad).unwrap_err()).contains("invalid JSON"));
    }

    #[test]
    fn render_formats() {
        let value = parse_yaml("{b: 1.0, a: [x]}").unwrap();
        let compact = render(&value, &CliConfig::default()).unwrap();
        assert_eq!(compact, r#"{"b":1.0,"a":["x"]}"#);

        let yaml = CliConfig {
            output: OutputFormat::Yaml,
            ..CliConfig::default()
        };
        assert_eq!(render(&value, &yaml).unwrap(), "b: 1.0\na:\n- x\n");
    }
}
