use serde::{Deserialize, Serialize};

/// Number of raw bytes in one EE895 measurement frame.
pub const FRAME_LEN: usize = 8;

/// One decoded measurement cycle from the sensor.
///
/// A `Reading` is immutable once produced; the all-zero value returned by
/// `Default` is what observers see before the first successful poll and is
/// a valid state, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Reading {
    /// CO2 concentration in ppm.
    pub co2: u16,
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Air pressure in hPa.
    pub pressure: f64,
}

impl Reading {
    /// Decodes one raw measurement frame.
    ///
    /// Layout: CO2 is the big-endian u16 at bytes [0,1]; temperature the
    /// big-endian u16 at bytes [2,3] in centidegrees; pressure the
    /// big-endian u16 at bytes [6,7] in tenths of hPa. Bytes [4,5] are
    /// reserved by the device.
    pub fn decode(raw: &[u8; FRAME_LEN]) -> Self {
        Reading {
            co2: u16::from_be_bytes([raw[0], raw[1]]),
            temperature: f64::from(u16::from_be_bytes([raw[2], raw[3]])) / 100.0,
            pressure: f64::from(u16::from_be_bytes([raw[6], raw[7]])) / 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_reference_frame() {
        let raw = [0x01, 0xF4, 0x02, 0x71, 0x00, 0x00, 0x03, 0xE8];
        let reading = Reading::decode(&raw);

        assert_eq!(reading.co2, 500);
        assert_eq!(reading.temperature, 6.25);
        assert_eq!(reading.pressure, 100.0);
    }

    #[test]
    fn decode_all_zero_frame() {
        let reading = Reading::decode(&[0u8; FRAME_LEN]);
        assert_eq!(reading, Reading::default());
    }

    #[test]
    fn decode_ignores_reserved_bytes() {
        let mut raw = [0u8; FRAME_LEN];
        raw[4] = 0xDE;
        raw[5] = 0xAD;

        let reading = Reading::decode(&raw);
        assert_eq!(reading, Reading::default());
    }

    #[test]
    fn decode_max_values() {
        let raw = [0xFF; FRAME_LEN];
        let reading = Reading::decode(&raw);

        assert_eq!(reading.co2, 65535);
        assert_eq!(reading.temperature, 655.35);
        assert_eq!(reading.pressure, 6553.5);
    }

    #[test]
    fn reading_serialization() {
        let reading = Reading {
            co2: 412,
            temperature: 21.37,
            pressure: 1013.2,
        };

        let json = serde_json::to_value(reading).unwrap();
        assert_eq!(json["co2"], 412);
        assert_eq!(json["temperature"], 21.37);
        assert_eq!(json["pressure"], 1013.2);
    }
}
