//! Configuration loading and validation

use crate::error::{PermissionsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Role that inherited and unscoped rules are filed under by default
pub const DEFAULT_UNSCOPED_ROLE: &str = "__unscoped__";

/// Complete permissions configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PermissionsConfig {
    #[serde(default)]
    pub evaluation: EvaluationSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EvaluationSection {
    /// Placeholder role for `inherit` and role-less definitions
    #[serde(default = "default_unscoped_role")]
    pub unscoped_role: String,

    /// Collect decision counters
    #[serde(default = "default_true")]
    pub enable_metrics: bool,
}

impl Default for EvaluationSection {
    fn default() -> Self {
        Self {
            unscoped_role: default_unscoped_role(),
            enable_metrics: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingSection {
    /// Filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_true")]
    pub with_target: bool,

    #[serde(default)]
    pub with_line_number: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: true,
            with_line_number: false,
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_unscoped_role() -> String { DEFAULT_UNSCOPED_ROLE.to_string() }
fn default_log_level() -> String { "info".to_string() }

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

impl PermissionsConfig {
    /// Load configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: PermissionsConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.evaluation.unscoped_role.trim().is_empty() {
            return Err(PermissionsError::InvalidConfig(
                "evaluation.unscoped_role cannot be empty".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(PermissionsError::InvalidConfig(format!(
                "logging.level must be one of {:?}, got '{}'",
                LOG_LEVELS, self.logging.level
            )));
        }

        Ok(())
    }
}
