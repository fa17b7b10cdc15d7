//! Servo Link Library
//!
//! Serial transport for smart-servo buses (Dynamixel, HerkuleX): finds
//! USB/TTL adapters, maps requested speeds onto what the OS can program,
//! keeps two processes off the same device with lock files, and moves
//! bytes with packet-sized deadlines.
//!
//! # Modules
//!
//! - `scanner`: Discovery of USB-serial and ACM device nodes
//! - `baud`: Standard-rate resolution and servo baudnum conversion
//! - `lock`: Cross-process `LCK..` device lock files
//! - `transport`: The serial link itself (open/close, tx/rx, timeouts)
//! - `port`: Port abstraction layer over `serialport`, plus a mock
//! - `device`: Adapter and servo family tags
//! - `config`: Configuration management with TOML support
//! - `error`: Command line error type

pub mod baud;
pub mod config;
pub mod device;
pub mod error;
pub mod lock;
pub mod port;
pub mod scanner;
pub mod transport;

// Re-export commonly used types for convenience
pub use baud::{BaudRateFlag, BaudRateResolver};
pub use device::{AdapterKind, ServoFamily};
pub use error::AppError;
pub use lock::{DeviceLock, LockGuard};
pub use port::{
    Connector, DataBits, FlowControl, MockConnector, MockSerialPort, Parity, PortConfiguration,
    PortError, SerialPortAdapter, StopBits, SyncSerialPort, SystemConnector,
};
pub use scanner::{DeviceClass, PortDescriptor, PortScanner};
pub use transport::{
    LinkConfig, LinkError, LinkState, OpenError, SerialTransport, TimingConfig, TransportBuilder,
};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
