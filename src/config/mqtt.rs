//! MQTT fan-out configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Configuration for the optional broker fan-out.
///
/// Disabled by default; when disabled nothing else in this section is
/// consulted.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MqttConfig {
    /// Whether readings are forwarded to the broker at all.
    pub enabled: bool,

    /// Broker hostname or IP.
    #[validate(length(min = 1, max = 255, message = "Host must be 1-255 characters"))]
    pub host: String,

    /// Broker port.
    #[validate(range(min = 1, message = "Port must be 1-65535"))]
    pub port: u16,

    /// Client identifier; a UUID is generated when empty.
    #[validate(length(max = 36, message = "Client ID must not exceed 36 characters"))]
    pub client_id: String,

    /// Optional broker credentials. Both must be set to take effect.
    pub username: Option<String>,
    pub password: Option<String>,

    /// Keep-alive interval in seconds.
    #[validate(range(min = 5, max = 3600, message = "Keep-alive must be 5-3600 seconds"))]
    pub keep_alive: u64,

    /// Topic readings are published to.
    #[validate(length(min = 1, message = "Topic must not be empty"))]
    pub topic: String,

    /// Quality of service for reading publishes.
    #[validate(range(max = 2, message = "QoS must be 0, 1, or 2"))]
    pub qos: u8,

    /// Whether the broker retains the last reading.
    pub retain: bool,

    /// Home-automation discovery announcements.
    #[validate(nested)]
    pub discovery: DiscoveryConfig,
}

impl Default for MqttConfig {
    fn default() -> Self {
        MqttConfig {
            enabled: false,
            host: "localhost".to_string(),
            port: 1883,
            client_id: String::new(),
            username: None,
            password: None,
            keep_alive: 60,
            topic: "airbee/reading".to_string(),
            qos: 1,
            retain: false,
            discovery: DiscoveryConfig::default(),
        }
    }
}

/// One-time channel announcement settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Whether the channels are announced at all.
    pub enabled: bool,

    /// Topic prefix the platform watches for registrations.
    #[validate(length(min = 1, message = "Discovery topic prefix must not be empty"))]
    pub topic_prefix: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        DiscoveryConfig {
            enabled: false,
            topic_prefix: "homeassistant/".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mqtt_config_validates() {
        let config = MqttConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.enabled);
        assert_eq!(config.port, 1883);
        assert_eq!(config.qos, 1);
    }

    #[test]
    fn rejects_empty_host() {
        let config = MqttConfig {
            host: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_qos() {
        let config = MqttConfig {
            qos: 3,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_short_keep_alive() {
        let config = MqttConfig {
            keep_alive: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_discovery_prefix() {
        let config = MqttConfig {
            discovery: DiscoveryConfig {
                enabled: true,
                topic_prefix: String::new(),
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
