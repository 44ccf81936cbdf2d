use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub devlink: DevlinkConfig,
}

/// How manifest lines are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Removed (first occurrence) from every emitted module path.
    #[serde(default = "default_strip_prefix")]
    pub strip_prefix: String,
    /// Spaces before each quoted entry.
    #[serde(default = "default_indent")]
    pub indent: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            strip_prefix: default_strip_prefix(),
            indent: default_indent(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevlinkConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for DevlinkConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

impl PlanConfig {
    /// Parse a TOML document; absent keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `content` is not valid TOML for this schema.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content).context("Failed to parse planner config")
    }
}

/// Load the planner config from `path`, or defaults when no path is given.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<PlanConfig> {
    let Some(path) = path else {
        return Ok(PlanConfig::default());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<PlanConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

const fn default_true() -> bool {
    true
}

fn default_strip_prefix() -> String {
    "kernel/".to_string()
}

const fn default_indent() -> usize {
    4
}
