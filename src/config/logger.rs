//! Logging configuration structures and validation logic.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Available formats for console log output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum LogFormat {
    #[default]
    #[serde(rename = "compact")]
    Compact,
    #[serde(rename = "pretty")]
    Pretty,
    #[serde(rename = "json")]
    Json,
}

/// Top-level logging configuration.
///
/// Controls the global level and the output targets (console and/or
/// journald).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggerConfig {
    /// Global log level. Valid values: trace, debug, info, warn, error
    /// (case-insensitive).
    #[validate(custom(function = "validate_log_level"))]
    pub level: String,

    /// Optional console output configuration.
    #[validate(nested)]
    pub console: Option<ConsoleConfig>,

    /// Optional systemd journald output configuration.
    #[validate(nested)]
    pub journald: Option<JournaldConfig>,
}

/// Validates that the provided log level is one of the supported values.
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => {
            let mut err = ValidationError::new("invalid_log_level");
            err.message = Some(format!("Invalid log level: {}", level).into());
            Err(err)
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            level: "info".to_string(),
            console: Some(ConsoleConfig::default()),
            journald: Some(JournaldConfig::default()),
        }
    }
}

/// Configuration for console log output.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Whether console output is enabled.
    pub enabled: bool,

    /// Output format for console logs.
    #[serde(default)]
    pub format: LogFormat,

    /// Enable ANSI color codes in console output.
    pub ansi_colors: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        ConsoleConfig {
            enabled: true,
            format: LogFormat::default(),
            ansi_colors: true,
        }
    }
}

/// Configuration for systemd journald output (Unix only).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct JournaldConfig {
    /// Whether journald output is enabled.
    #[serde(default)]
    pub enabled: bool,

    /// Identifier used for journal entries. Must be non-empty.
    #[validate(length(min = 1))]
    pub identifier: String,
}

impl Default for JournaldConfig {
    fn default() -> Self {
        JournaldConfig {
            enabled: false,
            identifier: "airbee".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_logger_config_validates() {
        let config = LoggerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.level, "info");
    }

    #[test]
    fn rejects_unknown_level() {
        let config = LoggerConfig {
            level: "verbose".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn accepts_uppercase_level() {
        let config = LoggerConfig {
            level: "DEBUG".into(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_empty_journald_identifier() {
        let config = LoggerConfig {
            journald: Some(JournaldConfig {
                enabled: true,
                identifier: String::new(),
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
