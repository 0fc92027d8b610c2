//! Sensor access over a register-addressed I2C bus.
//!
//! The poll loop owns a single `Ee895` reader, which in turn owns exclusive
//! access to the bus handle. `RegisterBus` is the seam between the reader
//! and the physical transport: the Linux implementation talks to
//! `/dev/i2c-N`, tests substitute a scripted bus.

use thiserror::Error;

use super::reading::{Reading, FRAME_LEN};

/// Register holding the measurement frame.
pub const DATA_REGISTER: u8 = 0x00;

/// Errors raised while opening or reading the sensor.
#[derive(Error, Debug)]
pub enum SensorError {
    /// The bus device node could not be opened. Fatal at startup: the
    /// agent must not run without a usable sensor.
    #[error("failed to open /dev/i2c-{bus} at address 0x{address:02X}")]
    DeviceOpen {
        bus: u32,
        address: u16,
        #[source]
        source: std::io::Error,
    },

    /// A register transfer failed.
    #[error("register read failed")]
    Io(#[source] std::io::Error),

    /// The transfer completed but returned fewer bytes than a full frame.
    /// Handled identically to `Io` by callers.
    #[error("short read of {got} bytes, expected {expected}")]
    ShortRead { got: usize, expected: usize },

    /// Bus access is not available on this platform.
    #[error("I2C bus access not supported on this platform")]
    Unsupported,
}

/// Transport seam for register-addressed block reads.
pub trait RegisterBus: Send {
    /// Reads up to `buf.len()` bytes starting at `register`, returning the
    /// number of bytes actually transferred.
    fn read_register_block(&mut self, register: u8, buf: &mut [u8]) -> Result<usize, SensorError>;
}

/// Reader for the EE895 measurement frame.
pub struct Ee895<B> {
    bus: B,
}

impl<B: RegisterBus> Ee895<B> {
    pub fn new(bus: B) -> Self {
        Ee895 { bus }
    }

    /// Performs one register read and decodes the frame.
    ///
    /// A transfer of fewer than [`FRAME_LEN`] bytes is a `ShortRead`;
    /// decoding itself cannot fail once a full frame is in hand.
    pub fn sample(&mut self) -> Result<Reading, SensorError> {
        let mut raw = [0u8; FRAME_LEN];
        let got = self.bus.read_register_block(DATA_REGISTER, &mut raw)?;
        if got != FRAME_LEN {
            return Err(SensorError::ShortRead {
                got,
                expected: FRAME_LEN,
            });
        }
        Ok(Reading::decode(&raw))
    }
}

#[cfg(target_os = "linux")]
pub use linux::{open, LinuxBus};

#[cfg(target_os = "linux")]
mod linux {
    use i2cdev::core::I2CDevice;
    use i2cdev::linux::LinuxI2CDevice;

    use super::{Ee895, RegisterBus, SensorError};

    /// `RegisterBus` over a Linux I2C character device.
    pub struct LinuxBus {
        device: LinuxI2CDevice,
    }

    impl RegisterBus for LinuxBus {
        fn read_register_block(
            &mut self,
            register: u8,
            buf: &mut [u8],
        ) -> Result<usize, SensorError> {
            // Register-pointer write followed by a block read; the kernel
            // transfers the full requested length or fails the ioctl.
            self.device
                .write(&[register])
                .map_err(|e| SensorError::Io(std::io::Error::other(e)))?;
            self.device
                .read(buf)
                .map_err(|e| SensorError::Io(std::io::Error::other(e)))?;
            Ok(buf.len())
        }
    }

    /// Opens the sensor on the given bus number and device address.
    pub fn open(bus: u32, address: u16) -> Result<Ee895<LinuxBus>, SensorError> {
        let path = format!("/dev/i2c-{}", bus);
        let device = LinuxI2CDevice::new(&path, address).map_err(|e| SensorError::DeviceOpen {
            bus,
            address,
            source: std::io::Error::other(e),
        })?;
        Ok(Ee895::new(LinuxBus { device }))
    }
}

#[cfg(not(target_os = "linux"))]
pub use fallback::{open, LinuxBus};

#[cfg(not(target_os = "linux"))]
mod fallback {
    use super::{Ee895, RegisterBus, SensorError};

    pub struct LinuxBus;

    impl RegisterBus for LinuxBus {
        fn read_register_block(
            &mut self,
            _register: u8,
            _buf: &mut [u8],
        ) -> Result<usize, SensorError> {
            Err(SensorError::Unsupported)
        }
    }

    pub fn open(_bus: u32, _address: u16) -> Result<Ee895<LinuxBus>, SensorError> {
        Err(SensorError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bus returning a fixed frame.
    struct FixedBus {
        frame: [u8; FRAME_LEN],
        last_register: Option<u8>,
    }

    impl RegisterBus for FixedBus {
        fn read_register_block(
            &mut self,
            register: u8,
            buf: &mut [u8],
        ) -> Result<usize, SensorError> {
            self.last_register = Some(register);
            buf.copy_from_slice(&self.frame);
            Ok(buf.len())
        }
    }

    /// Bus reporting a truncated transfer.
    struct ShortBus {
        got: usize,
    }

    impl RegisterBus for ShortBus {
        fn read_register_block(
            &mut self,
            _register: u8,
            _buf: &mut [u8],
        ) -> Result<usize, SensorError> {
            Ok(self.got)
        }
    }

    struct FailingBus;

    impl RegisterBus for FailingBus {
        fn read_register_block(
            &mut self,
            _register: u8,
            _buf: &mut [u8],
        ) -> Result<usize, SensorError> {
            Err(SensorError::Io(std::io::Error::other("transfer aborted")))
        }
    }

    #[test]
    fn sample_reads_data_register_and_decodes() {
        let mut reader = Ee895::new(FixedBus {
            frame: [0x01, 0xF4, 0x02, 0x71, 0x00, 0x00, 0x03, 0xE8],
            last_register: None,
        });

        let reading = reader.sample().expect("sample should succeed");
        assert_eq!(reading.co2, 500);
        assert_eq!(reading.temperature, 6.25);
        assert_eq!(reading.pressure, 100.0);
        assert_eq!(reader.bus.last_register, Some(DATA_REGISTER));
    }

    #[test]
    fn sample_rejects_short_transfer() {
        let mut reader = Ee895::new(ShortBus { got: 7 });

        let err = reader.sample().unwrap_err();
        assert!(matches!(
            err,
            SensorError::ShortRead {
                got: 7,
                expected: FRAME_LEN
            }
        ));
    }

    #[test]
    fn sample_propagates_bus_error() {
        let mut reader = Ee895::new(FailingBus);

        let err = reader.sample().unwrap_err();
        assert!(matches!(err, SensorError::Io(_)));
        assert!(err.to_string().contains("register read failed"));
    }

    #[test]
    fn device_open_error_names_bus_and_address() {
        let err = SensorError::DeviceOpen {
            bus: 1,
            address: 0x5E,
            source: std::io::Error::other("no such device"),
        };
        assert_eq!(
            err.to_string(),
            "failed to open /dev/i2c-1 at address 0x5E"
        );
    }
}
