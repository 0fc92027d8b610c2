//! Application configuration loading, validation, and management.
//!
//! The top-level `Config` aggregates logging, sensor, exporter, and MQTT
//! settings. It is loaded from a TOML file once at startup and is immutable
//! thereafter. When no configuration file is present the built-in defaults
//! are used, which are sufficient for a stock deployment (bus 1, address
//! 0x5E, scrape on :9871, fan-out disabled).

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use validator::Validate;

use self::exporter::ExporterConfig;
use self::logger::LoggerConfig;
use self::mqtt::MqttConfig;
use self::sensor::SensorConfig;

pub mod exporter;
pub mod logger;
pub mod mqtt;
pub mod sensor;

/// Simple macros for printing timestamped messages before the tracing
/// subscriber is initialized. Used during early configuration loading.
#[macro_export]
macro_rules! print_info {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::format_description::parse(
                        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
                    ).unwrap())
                    .unwrap()
            ).dim(),
            console::style("INFO").green(),
            format_args!($($arg)*)
        );
    };
}

#[macro_export]
macro_rules! print_warn {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::format_description::parse(
                        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
                    ).unwrap())
                    .unwrap()
            ).dim(),
            console::style("WARN").yellow(),
            format_args!($($arg)*)
        );
    };
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::format_description::parse(
                        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
                    ).unwrap())
                    .unwrap()
            ).dim(),
            console::style("ERROR").red(),
            format_args!($($arg)*)
        );
    };
}

/// Errors that can occur during configuration loading, parsing, or
/// validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error while accessing the configuration file.
    #[error("IO error while reading configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// Failure to parse the TOML configuration file.
    #[error("Parse error while reading configuration: {0}")]
    ParseError(String),

    /// Validation failure after successful parsing.
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Top-level application configuration.
#[derive(Serialize, Deserialize, Debug, Validate, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Logging subsystem configuration.
    #[validate(nested)]
    pub logger: LoggerConfig,

    /// Sensor bus identity and poll cadence.
    #[validate(nested)]
    pub sensor: SensorConfig,

    /// Scrape endpoint configuration.
    #[validate(nested)]
    pub exporter: ExporterConfig,

    /// MQTT fan-out configuration.
    #[validate(nested)]
    pub mqtt: MqttConfig,
}

impl Config {
    /// Constructs the configuration, falling back to built-in defaults
    /// when no configuration file can be located.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a located file cannot be read, parsed,
    /// or validated.
    pub fn new() -> Result<Self, ConfigError> {
        match Self::get_config_path() {
            Some(config_path) => Self::load(&config_path),
            None => {
                print_info!("No configuration file found, using built-in defaults");
                Ok(Config::default())
            }
        }
    }

    /// Determines the configuration file path.
    ///
    /// Priority:
    /// 1. `AIRBEE_CONFIG` environment variable
    /// 2. `/etc/airbee/config.toml`
    /// 3. none (built-in defaults)
    fn get_config_path() -> Option<PathBuf> {
        if let Ok(config_path) = std::env::var("AIRBEE_CONFIG") {
            let path = PathBuf::from(config_path);
            print_info!("Using config from AIRBEE_CONFIG: {}", path.display());
            return Some(path);
        }

        let fallback = Path::new("/etc/airbee/config.toml");
        if fallback.exists() {
            print_info!("Using default config path: {}", fallback.display());
            return Some(fallback.to_path_buf());
        }

        None
    }

    /// Loads and validates configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Propagates IO, parsing, and validation errors as `ConfigError`.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        print_info!("Loading configuration from: {}", path.display());

        let config_str = fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&config_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        print_info!("Successfully loaded config from: {}", path.display());
        Ok(config)
    }
}
