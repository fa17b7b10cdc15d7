//! Port abstraction layer for serial communication.
//!
//! Provides the traits the transport is written against, the
//! `serialport`-backed implementation, and a mock for tests.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::{MockConnector, MockOpenFailure, MockSerialPort};
pub use sync_port::*;
pub use traits::*;
