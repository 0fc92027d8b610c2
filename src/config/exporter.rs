//! Scrape endpoint configuration.

use std::collections::BTreeMap;
use std::net::{AddrParseError, SocketAddr};

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Configuration for the pull-metrics HTTP endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ExporterConfig {
    /// Socket address to listen on.
    #[validate(length(min = 1, message = "Listen address must not be empty"))]
    pub listen_address: String,

    /// Path serving the text exposition. The root path redirects here.
    #[validate(custom(function = "validate_metrics_path"))]
    pub metrics_path: String,

    /// Static labels attached identically to every exported series.
    /// Set once at process start, never mutated.
    pub labels: BTreeMap<String, String>,
}

fn validate_metrics_path(path: &str) -> Result<(), ValidationError> {
    if path.starts_with('/') && path.len() > 1 {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_metrics_path");
        err.message = Some("Metrics path must start with '/' and not be the root".into());
        Err(err)
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        ExporterConfig {
            listen_address: "0.0.0.0:9871".to_string(),
            metrics_path: "/metrics".to_string(),
            labels: BTreeMap::new(),
        }
    }
}

impl ExporterConfig {
    /// Parses the configured listen address.
    pub fn listen_addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.listen_address.parse()
    }
}
