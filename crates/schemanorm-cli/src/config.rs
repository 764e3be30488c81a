//! # CLI Configuration
//!
//! Optional YAML or JSON file selected with `--config`, falling back to the
//! `SCHEMANORM_CONFIG` environment variable. Every field has a default, so
//! an absent file and an empty file behave the same.
//!
//! ```yaml
//! output: yaml        # json (default) | yaml
//! pretty: true        # pretty-print JSON output
//! html:
//!   allowed_tags: [p, b, i, a]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use schemanorm_schema::{AllowlistSanitizer, SchemaNormalizer};

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV_VAR: &str = "SCHEMANORM_CONFIG";

/// Serialization used for normalized output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// Settings for the `html` schema type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HtmlConfig {
    /// Tags kept by the sanitizer. `None` keeps the built-in list.
    pub allowed_tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub output: OutputFormat,
    pub pretty: bool,
    pub html: HtmlConfig,
}

impl CliConfig {
    /// Load from `explicit`, else from the path in `SCHEMANORM_CONFIG`, else
    /// use the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), ?config, "loaded configuration");
        Ok(config)
    }

    /// Engine wired with the configured collaborators.
    pub fn engine(&self) -> SchemaNormalizer {
        let engine = SchemaNormalizer::new();
        match &self.html.allowed_tags {
            Some(tags) => engine.with_html_sanitizer(AllowlistSanitizer::with_tags(tags)),
            None => engine,
        }
    }
}
