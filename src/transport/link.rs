//! The serial link: one device handle, one device lock, one deadline.

use super::config::LinkConfig;
use super::error::{LinkError, OpenError};
use super::timeout::{TimeoutState, TimingConfig, LATENCY_RANGE};
use crate::baud::{select_baud_rate, BaudRateFlag, BaudRateResolver};
use crate::lock::{DeviceLock, LockGuard};
use crate::port::{
    Connector, PortConfiguration, PortError, SerialPortAdapter, SystemConnector,
};
use crate::scanner::PortScanner;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest sleep between polls when the adapter reports "no data" without
/// blocking.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Lifecycle of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Closed,
    Opening,
    Open,
    Closing,
}

/// Handle and lock of an open link. Field order makes the handle drop
/// before the lock.
#[derive(Debug)]
struct ActiveLink {
    port: Box<dyn SerialPortAdapter>,
    lock: LockGuard,
    flag: BaudRateFlag,
}

impl ActiveLink {
    fn close(self) {
        let ActiveLink { port, lock, .. } = self;
        let name = port.name().to_string();
        drop(port);
        if !lock.release() {
            warn!("Lock for {} could not be released", name);
        }
    }
}

/// Builder for a [`SerialTransport`] with non-default collaborators.
#[derive(Debug)]
pub struct TransportBuilder {
    config: LinkConfig,
    connector: Option<Box<dyn Connector>>,
    lock: Option<DeviceLock>,
    scanner: Option<PortScanner>,
    timing: TimingConfig,
    resolver: BaudRateResolver,
    line: PortConfiguration,
}

impl TransportBuilder {
    pub fn connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Some(Box::new(connector));
        self
    }

    /// Keep lock files in `dir` instead of the system temp directory.
    pub fn lock_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.lock = Some(DeviceLock::new(dir.as_ref()));
        self
    }

    pub fn device_lock(mut self, lock: DeviceLock) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Scanner used to resolve an `auto` device path.
    pub fn scanner(mut self, scanner: PortScanner) -> Self {
        self.scanner = Some(scanner);
        self
    }

    pub fn timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    pub fn resolver(mut self, resolver: BaudRateResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Framing settings other than the baud rate (data bits, parity, ...).
    pub fn line_settings(mut self, line: PortConfiguration) -> Self {
        self.line = line;
        self
    }

    pub fn build(self) -> SerialTransport {
        let device_path = if self.config.is_auto() {
            let scanner = self.scanner.unwrap_or_default();
            let found = scanner.autoselect();
            match &found {
                Some(path) => info!("Auto-selected serial device {}", path),
                None => warn!("Auto-selection found no serial device"),
            }
            found
        } else if self.config.device.is_empty() {
            None
        } else {
            Some(self.config.device.clone())
        };

        let baud_rate = select_baud_rate(self.config.baud, self.config.servo, self.config.adapter);
        let latency = self.timing.latency;

        SerialTransport {
            config: self.config,
            device_path,
            baud_rate,
            resolver: self.resolver,
            connector: self
                .connector
                .unwrap_or_else(|| Box::new(SystemConnector)),
            lock: self.lock.unwrap_or_default(),
            timing: self.timing,
            line: self.line,
            latency,
            state: LinkState::Closed,
            link: None,
            timeout: None,
        }
    }
}

/// Blocking, timeout-bounded serial link with cross-process device locking.
///
/// The device handle and the device lock are acquired together by
/// [`open_link`](Self::open_link) and released together by
/// [`close_link`](Self::close_link) or on drop.
///
/// A transport is driven by one thread. All operations take `&mut self`;
/// sharing one across threads needs external synchronization, and the
/// ordering of interleaved transfers is then the caller's problem.
///
/// # Example
/// ```no_run
/// use servo_link::{LinkConfig, SerialTransport, ServoFamily};
///
/// let mut link = SerialTransport::new(LinkConfig::new("auto", 1).with_servo(ServoFamily::Ax));
/// link.open_link()?;
/// link.tx(&[0xFF, 0xFF, 0x01, 0x02, 0x01, 0xFB])?;
/// link.set_timeout_packet(6);
/// let mut status = [0u8; 6];
/// let n = link.rx(&mut status)?;
/// link.close_link();
/// # let _ = n;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct SerialTransport {
    config: LinkConfig,
    device_path: Option<String>,
    baud_rate: u32,
    resolver: BaudRateResolver,
    connector: Box<dyn Connector>,
    lock: DeviceLock,
    timing: TimingConfig,
    line: PortConfiguration,
    latency: Duration,
    state: LinkState,
    link: Option<ActiveLink>,
    timeout: Option<TimeoutState>,
}

impl SerialTransport {
    /// Transport on real hardware with default collaborators.
    pub fn new(config: LinkConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: LinkConfig) -> TransportBuilder {
        TransportBuilder {
            config,
            connector: None,
            lock: None,
            scanner: None,
            timing: TimingConfig::default(),
            resolver: BaudRateResolver::default(),
            line: PortConfiguration::default(),
        }
    }

    /// Lock the device and open it at the resolved speed.
    pub fn open_link(&mut self) -> Result<(), OpenError> {
        if self.link.is_some() {
            return Err(OpenError::AlreadyOpen);
        }
        let path = self
            .device_path
            .clone()
            .ok_or_else(|| OpenError::NotFound(self.config.device.clone()))?;

        self.state = LinkState::Opening;
        match self.establish(&path) {
            Ok(link) => {
                info!("Opened {} at {} ({} bps)", path, link.flag, self.baud_rate);
                self.link = Some(link);
                self.state = LinkState::Open;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to open {}: {}", path, e);
                self.state = LinkState::Closed;
                Err(e)
            }
        }
    }

    fn establish(&self, path: &str) -> Result<ActiveLink, OpenError> {
        if self.lock.is_locked(path) {
            return Err(OpenError::Locked(path.to_string()));
        }

        let flag = self.resolver.resolve(self.baud_rate);
        if flag.is_custom() {
            if !self.connector.supports_custom_speed() {
                return Err(OpenError::UnsupportedBaud(flag.rate()));
            }
            debug!("{} bps is not a standard rate, using a custom divisor", flag.rate());
        }

        let lock = self
            .lock
            .acquire(path)
            .ok_or_else(|| OpenError::Locked(path.to_string()))?;

        let mut line = self.line.clone();
        line.baud_rate = flag.rate();

        // On error `lock` drops here and the lock file goes with it
        let port = self.connector.open(path, &line).map_err(|e| match e {
            PortError::NotFound(_) => OpenError::NotFound(path.to_string()),
            PortError::Config(_) if flag.is_custom() => OpenError::UnsupportedBaud(flag.rate()),
            source => OpenError::Os {
                path: path.to_string(),
                source,
            },
        })?;

        Ok(ActiveLink { port, lock, flag })
    }

    pub fn is_open(&self) -> bool {
        self.state == LinkState::Open
    }

    /// Release the handle, then the lock. Safe to call repeatedly.
    pub fn close_link(&mut self) {
        if let Some(link) = self.link.take() {
            self.state = LinkState::Closing;
            link.close();
            debug!("Closed {}", self.device_path.as_deref().unwrap_or("link"));
        }
        self.state = LinkState::Closed;
    }

    /// Write once. Returns the number of bytes the OS accepted, which is
    /// zero when the channel is saturated.
    pub fn tx(&mut self, data: &[u8]) -> Result<usize, LinkError> {
        let link = self.link.as_mut().ok_or(LinkError::NotOpen)?;
        match link.port.write_bytes(data) {
            Ok(n) => {
                if n < data.len() {
                    debug!("Short write: {} of {} bytes", n, data.len());
                }
                Ok(n)
            }
            Err(e) if e.is_transient() => Ok(0),
            Err(e) => Err(self.fault(e)),
        }
    }

    /// Read until `buffer` is full or the armed deadline passes.
    ///
    /// Arms the default timeout when none is armed or the armed one has
    /// already passed. The spent deadline stays visible to `check_timeout`
    /// and `is_timed_out` until the next call. Returns the number of bytes
    /// received; zero means nothing arrived in time.
    pub fn rx(&mut self, buffer: &mut [u8]) -> Result<usize, LinkError> {
        if self.link.is_none() {
            return Err(LinkError::NotOpen);
        }
        let deadline = match self.timeout {
            Some(armed) if !armed.expired() => armed,
            _ => {
                let armed = TimeoutState::arm(self.timing.default_timeout);
                self.timeout = Some(armed);
                armed
            }
        }
        .deadline();

        let link = self.link.as_mut().ok_or(LinkError::NotOpen)?;
        match read_until(link.port.as_mut(), buffer, deadline) {
            Ok(n) => Ok(n),
            Err(e) => Err(self.fault(e)),
        }
    }

    /// Discard pending input and output. No-op when closed.
    pub fn flush(&mut self) {
        if let Some(link) = self.link.as_mut() {
            if let Err(e) = link.port.clear_buffers() {
                warn!("Failed to flush {}: {}", link.port.name(), e);
            }
        }
    }

    /// Record the adapter latency used by packet timeouts. Values outside
    /// 1..=128 ms are ignored.
    pub fn set_latency(&mut self, latency: Duration) {
        if LATENCY_RANGE.contains(&latency) {
            self.latency = latency;
        } else {
            warn!(
                "Invalid latency value {:?}, not in [1;128] ms range",
                latency
            );
        }
    }

    /// Low-latency mode is not driven at this layer; always false.
    pub fn switch_high_speed(&mut self) -> bool {
        debug!("High speed mode is not available");
        false
    }

    /// Arm a deadline long enough to receive `packet_len` bytes.
    pub fn set_timeout_packet(&mut self, packet_len: usize) {
        let duration = self.timing.packet_timeout(
            packet_len,
            self.baud_rate,
            self.line.bits_per_frame(),
            self.latency,
        );
        self.set_timeout(duration);
    }

    /// Arm an explicit deadline.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(TimeoutState::arm(timeout));
    }

    /// Time elapsed since the current deadline was armed.
    pub fn check_timeout(&self) -> Duration {
        self.timeout.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// True once the armed deadline has passed.
    pub fn is_timed_out(&self) -> bool {
        self.timeout.is_some_and(|t| t.expired())
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Device node in use; `None` if auto-selection found nothing.
    pub fn device_path(&self) -> Option<&str> {
        self.device_path.as_deref()
    }

    /// Last path component of the device node (`ttyUSB0`).
    pub fn device_name(&self) -> Option<&str> {
        let path = self.device_path.as_deref()?;
        Path::new(path).file_name()?.to_str()
    }

    /// Effective rate after baudnum conversion and adapter limits.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn baud_flag(&self) -> BaudRateFlag {
        self.resolver.resolve(self.baud_rate)
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    fn fault(&mut self, error: PortError) -> LinkError {
        warn!(
            "Hard I/O failure on {}: {}, closing link",
            self.device_path.as_deref().unwrap_or("link"),
            error
        );
        self.close_link();
        LinkError::Io(error)
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.close_link();
    }
}

fn read_until(
    port: &mut dyn SerialPortAdapter,
    buffer: &mut [u8],
    deadline: Instant,
) -> Result<usize, PortError> {
    let mut total = 0;

    while total < buffer.len() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        port.set_timeout(remaining)?;

        match port.read_bytes(&mut buffer[total..]) {
            Ok(0) => std::thread::sleep(remaining.min(POLL_INTERVAL)),
            Ok(n) => total += n,
            Err(e) if e.is_transient() => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                std::thread::sleep(remaining.min(POLL_INTERVAL));
            }
            Err(e) => return Err(e),
        }
    }

    Ok(total)
}
