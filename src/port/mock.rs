//! Mock serial port implementation for testing.
//!
//! Provides a `MockSerialPort` that simulates serial port behavior without
//! requiring actual hardware, and a `MockConnector` that hands it to the
//! transport. Clones share state, so a test can keep a handle to the port
//! the transport is driving.

use super::error::PortError;
use super::traits::{Connector, PortConfiguration, SerialPortAdapter};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Inner state of the mock port, protected by a mutex for interior mutability.
#[derive(Debug, Default)]
struct MockPortState {
    /// Queue of bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Log of all bytes written to the port.
    write_log: Vec<Vec<u8>>,
    /// Written bytes are appended to the read queue.
    loopback: bool,
    /// Maximum bytes accepted per write, to simulate a saturated channel.
    write_capacity: Option<usize>,
    /// Every operation fails as if the device was unplugged.
    disconnected: bool,
    /// Configured timeout duration.
    timeout: Duration,
    /// Number of times the buffers were cleared.
    clear_count: usize,
}

/// Mock serial port implementation for testing.
///
/// This implementation allows you to:
/// - Enqueue data to be returned by read operations
/// - Inspect what data was written
/// - Echo writes back as a loopback device
/// - Simulate short writes and unplugged devices
///
/// # Example
/// ```
/// use servo_link::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
///
/// // Enqueue a status packet to be read
/// port.enqueue_read(&[0xFF, 0xFF, 0x01, 0x02, 0x00, 0xFC]);
///
/// let mut buffer = [0u8; 6];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(n, 6);
///
/// // Write a ping and check it was logged
/// port.write_bytes(&[0xFF, 0xFF, 0x01, 0x02, 0x01, 0xFB]).unwrap();
/// assert_eq!(port.get_write_log().len(), 1);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    /// The port name/identifier.
    name: String,
    /// The internal state, shared between clones.
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState {
                timeout: Duration::from_millis(50),
                ..Default::default()
            })),
        }
    }

    /// Create a mock whose writes are echoed back to its read queue.
    pub fn loopback(name: impl Into<String>) -> Self {
        let port = Self::new(name);
        port.state.lock().loopback = true;
        port
    }

    /// Enqueue bytes to be returned by subsequent read operations.
    pub fn enqueue_read(&mut self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Get a copy of all data written to the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Limit how many bytes a single write accepts.
    pub fn set_write_capacity(&mut self, capacity: Option<usize>) {
        self.state.lock().write_capacity = capacity;
    }

    /// Simulate the device disappearing (or coming back).
    pub fn set_disconnected(&mut self, disconnected: bool) {
        self.state.lock().disconnected = disconnected;
    }

    /// How many times `clear_buffers` ran.
    pub fn clear_count(&self) -> usize {
        self.state.lock().clear_count
    }

    /// Last timeout the transport programmed.
    pub fn timeout(&self) -> Duration {
        self.state.lock().timeout
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }

    fn unplugged() -> PortError {
        PortError::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "device disconnected",
        ))
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        if state.disconnected {
            return Err(Self::unplugged());
        }

        let accepted = match state.write_capacity {
            Some(capacity) => data.len().min(capacity),
            None => data.len(),
        };
        let written = &data[..accepted];

        state.write_log.push(written.to_vec());
        if state.loopback {
            state.read_queue.extend(written);
        }

        Ok(accepted)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        if state.disconnected {
            return Err(Self::unplugged());
        }

        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match state.read_queue.pop_front() {
                Some(queued_byte) => {
                    *byte = queued_byte;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 && !buffer.is_empty() {
            // Simulate "would block" behavior by returning an I/O error
            Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "No data available",
            )))
        } else {
            Ok(bytes_read)
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        self.state.lock().timeout = timeout;
        Ok(())
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        if state.disconnected {
            return Err(Self::unplugged());
        }
        state.read_queue.clear();
        state.clear_count += 1;
        Ok(())
    }

    fn bytes_to_read(&self) -> Option<usize> {
        Some(self.available_bytes())
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}

/// Failure a `MockConnector` can be told to report on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOpenFailure {
    /// The device node does not exist.
    NotFound,
    /// The line settings were rejected.
    Config,
    /// Any other OS-level failure (permissions, busy).
    Io,
}

impl MockOpenFailure {
    fn to_error(self, path: &str) -> PortError {
        match self {
            Self::NotFound => PortError::not_found(path),
            Self::Config => PortError::config(format!("unsupported settings for {}", path)),
            Self::Io => PortError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "permission denied",
            )),
        }
    }
}

#[derive(Debug, Default)]
struct MockConnectorState {
    opened: Vec<(String, u32)>,
    fail_with: Option<MockOpenFailure>,
}

/// Connector that hands out clones of one `MockSerialPort`.
#[derive(Debug, Clone)]
pub struct MockConnector {
    port: MockSerialPort,
    custom_speed: bool,
    state: Arc<Mutex<MockConnectorState>>,
}

impl MockConnector {
    pub fn new(port: MockSerialPort) -> Self {
        Self {
            port,
            custom_speed: true,
            state: Arc::new(Mutex::new(MockConnectorState::default())),
        }
    }

    /// Pretend the platform has no custom-divisor mechanism.
    pub fn without_custom_speed(mut self) -> Self {
        self.custom_speed = false;
        self
    }

    /// Make every subsequent open fail (or succeed again with `None`).
    pub fn fail_opens_with(&self, failure: Option<MockOpenFailure>) {
        self.state.lock().fail_with = failure;
    }

    /// Every `(path, baud)` pair that was successfully opened.
    pub fn opened(&self) -> Vec<(String, u32)> {
        self.state.lock().opened.clone()
    }

    /// The shared port handed to the transport.
    pub fn port(&self) -> MockSerialPort {
        self.port.clone()
    }
}

impl Connector for MockConnector {
    fn open(
        &self,
        path: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        let mut state = self.state.lock();
        if let Some(failure) = state.fail_with {
            return Err(failure.to_error(path));
        }
        state.opened.push((path.to_string(), config.baud_rate));

        let mut port = self.port.clone();
        port.set_timeout(config.timeout)?;
        Ok(Box::new(port))
    }

    fn supports_custom_speed(&self) -> bool {
        self.custom_speed
    }
}
