//! Serial transport: open/close, byte transfer and the timeout model.

pub mod config;
pub mod error;
pub mod link;
pub mod timeout;

pub use config::{LinkConfig, AUTO_DEVICE};
pub use error::{LinkError, OpenError};
pub use link::{LinkState, SerialTransport, TransportBuilder};
pub use timeout::{TimeoutState, TimingConfig, DEFAULT_LATENCY};
