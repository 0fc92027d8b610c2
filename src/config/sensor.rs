//! Sensor bus configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Identity of the physical sensor and the acquisition cadence.
///
/// Bus number and device address are fixed for the lifetime of the
/// process; they select the device node for the bus open and are embedded
/// in published payloads.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SensorConfig {
    /// I2C bus number (`/dev/i2c-N`).
    pub bus: u32,

    /// 7-bit device address on the bus.
    #[validate(range(
        min = 0x08,
        max = 0x77,
        message = "I2C address must be within the 7-bit range 0x08..=0x77"
    ))]
    pub address: u16,

    /// Seconds between poll cycles, identical after success and failure.
    #[validate(range(min = 1, message = "Poll interval must be at least 1 second"))]
    pub poll_interval_secs: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        SensorConfig {
            bus: 1,
            address: 0x5E,
            poll_interval_secs: 15,
        }
    }
}
