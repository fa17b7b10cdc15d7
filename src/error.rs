use crate::config::ConfigError;
use crate::transport::{LinkError, OpenError};
use std::fmt;

/// Top-level error for the `servo-link` command line tool.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Open(OpenError),
    Link(LinkError),
    InvalidArgument(String),
    IoError(std::io::Error),
    SerdeError(serde_json::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Open(e) => write!(f, "Could not open the link: {e}"),
            Self::Link(e) => write!(f, "Link error: {e}"),
            Self::InvalidArgument(details) => write!(f, "Invalid argument: {details}"),
            Self::IoError(e) => write!(f, "An I/O error occurred: {e}"),
            Self::SerdeError(e) => write!(f, "A serialization error occurred: {e}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Open(e) => Some(e),
            Self::Link(e) => Some(e),
            Self::InvalidArgument(_) => None,
            Self::IoError(e) => Some(e),
            Self::SerdeError(e) => Some(e),
        }
    }
}

impl AppError {
    /// Process exit code: 2 for usage problems, 3 when another owner holds
    /// the device, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidArgument(_) => 2,
            Self::Open(e) if e.is_contention() => 3,
            _ => 1,
        }
    }
}

// Implement `From` conversions to allow the `?` operator to work seamlessly.
impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<OpenError> for AppError {
    fn from(err: OpenError) -> Self {
        AppError::Open(err)
    }
}

impl From<LinkError> for AppError {
    fn from(err: LinkError) -> Self {
        AppError::Link(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerdeError(err)
    }
}
