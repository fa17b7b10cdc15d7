//! Synchronous serial port implementation.
//!
//! Wraps the `serialport` crate's `SerialPort` trait with our own `SerialPortAdapter`
//! trait, and provides the `SystemConnector` the transport uses by default.

use super::error::PortError;
use super::traits::{Connector, PortConfiguration, SerialPortAdapter};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::debug;

/// Synchronous serial port implementation wrapping `serialport::SerialPort`.
pub struct SyncSerialPort {
    /// The underlying serial port implementation.
    port: Box<dyn serialport::SerialPort>,
    /// The port name/path for identification.
    name: String,
}

impl SyncSerialPort {
    /// Open a serial port with the given configuration.
    ///
    /// Rates outside the platform speed table are passed through unchanged;
    /// `serialport` programs them with the OS custom-divisor mechanism
    /// (`BOTHER` on Linux, `IOSSIOSPEED` on macOS) and reports
    /// `InvalidInput` where none exists.
    ///
    /// # Example
    /// ```no_run
    /// use servo_link::port::{SyncSerialPort, PortConfiguration};
    ///
    /// let config = PortConfiguration::default();
    /// let port = SyncSerialPort::open("/dev/ttyUSB0", &config)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(port_name: &str, config: &PortConfiguration) -> Result<Self, PortError> {
        let port = serialport::new(port_name, config.baud_rate)
            .data_bits(config.data_bits.into())
            .flow_control(config.flow_control.into())
            .parity(config.parity.into())
            .stop_bits(config.stop_bits.into())
            .timeout(config.timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => PortError::not_found(port_name),
                serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                    PortError::not_found(port_name)
                }
                serialport::ErrorKind::InvalidInput => PortError::config(e.to_string()),
                _ => PortError::Serial(e),
            })?;

        debug!("Opened {} at {} baud", port_name, config.baud_rate);

        Ok(Self {
            port,
            name: port_name.to_string(),
        })
    }

    /// Get a reference to the underlying serialport implementation.
    pub fn as_raw(&self) -> &dyn serialport::SerialPort {
        &*self.port
    }
}

impl SerialPortAdapter for SyncSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.port.write(data).map_err(PortError::Io)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.port.read(buffer).map_err(PortError::Io)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        self.port.set_timeout(timeout).map_err(PortError::Serial)
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        self.port
            .clear(serialport::ClearBuffer::All)
            .map_err(PortError::Serial)
    }

    fn bytes_to_read(&self) -> Option<usize> {
        self.port.bytes_to_read().ok().map(|n| n as usize)
    }
}

impl std::fmt::Debug for SyncSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSerialPort")
            .field("name", &self.name)
            .field("baud_rate", &self.port.baud_rate())
            .finish()
    }
}

/// Opens real OS serial devices through `serialport`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemConnector;

impl Connector for SystemConnector {
    fn open(
        &self,
        path: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        Ok(Box::new(SyncSerialPort::open(path, config)?))
    }

    fn supports_custom_speed(&self) -> bool {
        cfg!(any(
            target_os = "linux",
            target_os = "android",
            target_os = "macos",
            target_os = "ios",
            windows
        ))
    }
}
