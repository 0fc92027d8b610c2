//! Centralized logging configuration and initialization manager.
//!
//! `LoggerManager` validates the logging configuration and installs the
//! global `tracing` subscriber with console and/or systemd journald
//! layers.

use std::io;

use thiserror::Error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};
use validator::{Validate, ValidationErrors};

use crate::{
    config::logger::{ConsoleConfig, LogFormat, LoggerConfig},
    print_warn,
};

/// Errors that can occur during logger configuration or initialization.
#[derive(Error, Debug)]
pub enum LoggerError {
    /// Validation errors from the logger configuration struct.
    #[error("Logger configuration validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    /// IO error, typically during journald socket operations.
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// No output layers were successfully configured.
    #[error("No logging layers were configured or successfully initialized")]
    NoLayersConfigured,
}

/// Manages logging configuration and global subscriber initialization.
pub struct LoggerManager {
    config: LoggerConfig,
}

impl LoggerManager {
    /// Creates a new `LoggerManager` and validates the provided
    /// configuration.
    pub fn new(config: LoggerConfig) -> Result<Self, LoggerError> {
        config.validate()?;

        Ok(LoggerManager { config })
    }

    /// Initializes the global `tracing` subscriber with the configured
    /// layers. Must be called once at startup before any tracing macros
    /// are used.
    ///
    /// A journald failure degrades to console-only output when the console
    /// is enabled; with the console disabled it leaves no layer and is an
    /// error.
    pub fn init(&mut self) -> Result<(), LoggerError> {
        let mut layers = Vec::new();

        if let Some(console_config) = self.config.console.as_ref().filter(|c| c.enabled) {
            layers.push(self.build_console_layer(console_config));
        }

        if self.config.journald.as_ref().is_some_and(|j| j.enabled) {
            match tracing_journald::layer() {
                Ok(journald_layer) => {
                    layers.push(journald_layer.with_filter(self.env_filter()).boxed());
                }
                Err(e) => {
                    print_warn!("Failed to initialize systemd journald logger: {}", e);
                }
            }
        }

        if layers.is_empty() {
            print_warn!("No logging layers were initialized. Please check your configuration.");
            return Err(LoggerError::NoLayersConfigured);
        }

        tracing_subscriber::registry().with(layers).init();
        Ok(())
    }

    /// Environment filter with the configured level as the fallback.
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.config.level))
    }

    /// Constructs a console output layer according to the configuration.
    fn build_console_layer(
        &self,
        config: &ConsoleConfig,
    ) -> Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync> {
        let filter = self.env_filter();
        match config.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_ansi(config.ansi_colors)
                .with_writer(io::stdout)
                .with_filter(filter)
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .pretty()
                .with_ansi(config.ansi_colors)
                .with_writer(io::stdout)
                .with_filter(filter)
                .boxed(),
            LogFormat::Compact => fmt::layer()
                .compact()
                .with_ansi(config.ansi_colors)
                .with_writer(io::stdout)
                .with_filter(filter)
                .boxed(),
        }
    }
}
