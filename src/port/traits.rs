//! Core traits for serial port abstraction.
//!
//! `SerialPortAdapter` covers an already-opened handle, `Connector` covers
//! the act of opening one. Together they let the transport run against real
//! hardware or against the in-memory mock.

use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Line settings used when opening a serial device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortConfiguration {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// Flow control mode.
    pub flow_control: FlowControl,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Initial read/write timeout.
    pub timeout: Duration,
}

impl Default for PortConfiguration {
    /// Servo buses run 8N1 without flow control.
    fn default() -> Self {
        Self {
            baud_rate: 57600,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            timeout: Duration::from_millis(50),
        }
    }
}

impl PortConfiguration {
    /// Number of bit times one character occupies on the wire: the start
    /// bit, the data bits, an optional parity bit and the stop bits.
    pub fn bits_per_frame(&self) -> u32 {
        let parity = match self.parity {
            Parity::None => 0,
            Parity::Odd | Parity::Even => 1,
        };
        1 + self.data_bits.count() + parity + self.stop_bits.count()
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl DataBits {
    pub fn count(self) -> u32 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopBits {
    One,
    Two,
}

impl StopBits {
    pub fn count(self) -> u32 {
        match self {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// Trait for serial port I/O operations on an opened handle.
///
/// This trait abstracts over synchronous serial port operations, allowing both
/// real hardware ports and mock implementations for testing.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes actually written, which may be short.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read bytes from the serial port into the provided buffer.
    ///
    /// Blocks for at most the configured timeout. Returns the number of
    /// bytes actually read.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;

    /// Set the read/write timeout for this port.
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError>;

    /// Clear both input and output buffers.
    ///
    /// This discards any unread data in the receive buffer and any unsent
    /// data in the transmit buffer.
    fn clear_buffers(&mut self) -> Result<(), PortError>;

    /// Get the current bytes available to read (if supported).
    ///
    /// Returns `None` if the operation is not supported or cannot be determined.
    fn bytes_to_read(&self) -> Option<usize> {
        None
    }
}

/// Opens serial handles for the transport.
pub trait Connector: Send + std::fmt::Debug {
    /// Open `path` with the given line settings.
    fn open(
        &self,
        path: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError>;

    /// Whether rates outside the standard speed table can be programmed.
    fn supports_custom_speed(&self) -> bool;
}
