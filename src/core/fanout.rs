//! Best-effort MQTT fan-out of readings.
//!
//! Each successful poll cycle hands one reading to `MqttFanout::publish`
//! as a detached task. The payload is enriched with host and bus identity
//! plus the configured static labels, serialized to JSON, and written to a
//! single topic. Failures are logged and the cycle's publish abandoned:
//! there is no retry, no queue and no backlog, so a stalled broker can
//! only ever block its own task.
//!
//! When discovery is enabled, the first publish also announces the three
//! measurement channels under the configured Home Assistant topic prefix.
//! The announcements are retained and identical across restarts, so
//! duplicates are harmless.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use super::poller::ReadingSink;
use super::reading::Reading;
use crate::config::mqtt::MqttConfig;

/// Bus number and device address, fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct DeviceIdentity {
    pub bus: u32,
    pub address: u16,
}

/// Device address rendered as a hex string (`"0x5E"`) in payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cAddress(pub u16);

impl Serialize for I2cAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{:02X}", self.0))
    }
}

/// Errors raised while building or sending a publish.
#[derive(Error, Debug)]
pub enum FanoutError {
    /// Payload serialization failed; the cycle's publish is skipped.
    #[error("failed to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The client could not queue the publish.
    #[error("failed to publish to broker: {0}")]
    Publish(#[from] rumqttc::ClientError),

    /// QoS outside 0..=2.
    #[error("invalid QoS value {0}, must be 0, 1, or 2")]
    InvalidQos(u8),
}

#[derive(Serialize)]
struct SensorPayload<'a> {
    co2: u16,
    temperature: f64,
    pressure: f64,
    hostname: &'a str,
    i2c_bus: u32,
    i2c_address: I2cAddress,
    labels: &'a BTreeMap<String, String>,
}

/// One Home Assistant sensor registration.
#[derive(Serialize)]
struct DiscoveryAnnouncement<'a> {
    name: String,
    unique_id: String,
    state_topic: &'a str,
    unit_of_measurement: &'a str,
    device_class: &'a str,
    value_template: &'a str,
}

struct Channel {
    key: &'static str,
    label: &'static str,
    unit: &'static str,
    device_class: &'static str,
    value_template: &'static str,
}

const CHANNELS: [Channel; 3] = [
    Channel {
        key: "co2",
        label: "CO2",
        unit: "ppm",
        device_class: "carbon_dioxide",
        value_template: "{{ value_json.co2 }}",
    },
    Channel {
        key: "temperature",
        label: "Temperature",
        unit: "°C",
        device_class: "temperature",
        value_template: "{{ value_json.temperature }}",
    },
    Channel {
        key: "pressure",
        label: "Pressure",
        unit: "hPa",
        device_class: "pressure",
        value_template: "{{ value_json.pressure }}",
    },
];

fn map_qos(qos: u8) -> Result<QoS, FanoutError> {
    match qos {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(FanoutError::InvalidQos(other)),
    }
}

/// Builds the discovery config topic for one channel.
fn discovery_topic(prefix: &str, node_id: &str, channel: &str) -> String {
    format!(
        "{}/sensor/{}_{}/config",
        prefix.trim_end_matches('/'),
        node_id,
        channel
    )
}

/// Restricts a hostname to the characters Home Assistant accepts in
/// node and object ids.
fn sanitize_node_id(hostname: &str) -> String {
    hostname
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// MQTT publish fan-out for sensor readings.
pub struct MqttFanout {
    client: AsyncClient,
    topic: String,
    qos: QoS,
    retain: bool,
    hostname: String,
    identity: DeviceIdentity,
    labels: BTreeMap<String, String>,
    discovery_prefix: Option<String>,
    announced: AtomicBool,
}

impl MqttFanout {
    /// Creates the client and spawns the background event-loop driver.
    ///
    /// The connection itself is established asynchronously by the driver;
    /// publishes issued before the broker is reachable are queued by the
    /// client up to its channel capacity and dropped beyond it.
    pub fn connect(
        config: &MqttConfig,
        identity: DeviceIdentity,
        hostname: String,
        labels: BTreeMap<String, String>,
    ) -> Result<Self, FanoutError> {
        let client_id = if config.client_id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            config.client_id.clone()
        };

        let mut opts = MqttOptions::new(client_id, config.host.clone(), config.port);
        opts.set_keep_alive(Duration::from_secs(config.keep_alive));
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            opts.set_credentials(username.clone(), password.clone());
        }

        let (client, event_loop) = AsyncClient::new(opts, 10);
        tokio::spawn(Self::drive(event_loop));

        Ok(Self {
            client,
            topic: config.topic.clone(),
            qos: map_qos(config.qos)?,
            retain: config.retain,
            hostname,
            identity,
            labels,
            discovery_prefix: config
                .discovery
                .enabled
                .then(|| config.discovery.topic_prefix.clone()),
            announced: AtomicBool::new(false),
        })
    }

    /// Drives the rumqttc event loop forever.
    ///
    /// Each `poll` progresses the connection; on error the next poll
    /// reconnects, so a short pause is enough to avoid a tight error loop.
    async fn drive(mut event_loop: EventLoop) {
        loop {
            match event_loop.poll().await {
                Ok(event) => trace!("mqtt event: {:?}", event),
                Err(e) => {
                    warn!("mqtt connection error: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    /// Announces the three measurement channels for auto-registration.
    async fn announce(&self, prefix: &str) -> Result<(), FanoutError> {
        let node_id = sanitize_node_id(&self.hostname);

        for channel in &CHANNELS {
            let topic = discovery_topic(prefix, &node_id, channel.key);
            let announcement = DiscoveryAnnouncement {
                name: format!("{} {}", self.hostname, channel.label),
                unique_id: format!("{}_{}", node_id, channel.key),
                state_topic: &self.topic,
                unit_of_measurement: channel.unit,
                device_class: channel.device_class,
                value_template: channel.value_template,
            };
            let payload = serde_json::to_vec(&announcement)?;

            // Retained so the platform picks the registration up even when
            // it starts after this agent.
            self.client
                .publish(topic, QoS::AtLeastOnce, true, payload)
                .await?;
        }

        debug!("announced discovery channels under '{}'", prefix);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ReadingSink for MqttFanout {
    async fn publish(
        &self,
        reading: Reading,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // One announcement per process lifetime. A failed announcement is
        // logged and not retried here: the configs are retained and
        // identical, so the next process start repairs it.
        if let Some(prefix) = &self.discovery_prefix {
            if !self.announced.swap(true, Ordering::SeqCst) {
                if let Err(e) = self.announce(prefix).await {
                    error!("failed to announce discovery channels: {}", e);
                }
            }
        }

        let payload = serde_json::to_vec(&SensorPayload {
            co2: reading.co2,
            temperature: reading.temperature,
            pressure: reading.pressure,
            hostname: &self.hostname,
            i2c_bus: self.identity.bus,
            i2c_address: I2cAddress(self.identity.address),
            labels: &self.labels,
        })
        .map_err(FanoutError::Serialization)?;

        self.client
            .publish(self.topic.clone(), self.qos, self.retain, payload)
            .await
            .map_err(FanoutError::Publish)?;

        Ok(())
    }
}
