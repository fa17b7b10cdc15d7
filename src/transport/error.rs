//! Transport-level outcomes.
//!
//! Contention and unsupported speeds are ordinary open results. Only
//! handle-level failures surface from transfers; a read or write that moved
//! nothing is `Ok(0)`, not an error.

use crate::port::PortError;
use thiserror::Error;

/// Why `open_link` did not produce an open link.
#[derive(Debug, Error)]
pub enum OpenError {
    /// No device path (scan found nothing) or the node does not exist.
    #[error("Serial device not found: {0}")]
    NotFound(String),

    /// Another live process holds the device lock.
    #[error("Serial device {0} is locked by another instance")]
    Locked(String),

    /// The rate needs a custom divisor the platform cannot program.
    #[error("Baud rate {0} bps is not supported on this platform")]
    UnsupportedBaud(u32),

    /// The OS refused to open the device.
    #[error("Unable to open {path}: {source}")]
    Os {
        path: String,
        #[source]
        source: PortError,
    },

    /// The transport already holds an open link.
    #[error("Link is already open")]
    AlreadyOpen,
}

impl OpenError {
    /// True for outcomes another attempt could resolve without a
    /// configuration change.
    pub fn is_contention(&self) -> bool {
        matches!(self, OpenError::Locked(_))
    }
}

/// Hard transfer failures.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The transport is closed.
    #[error("Link is not open")]
    NotOpen,

    /// The handle failed (device unplugged, permission revoked). The link
    /// has been closed.
    #[error("Link I/O failure: {0}")]
    Io(#[from] PortError),
}
