//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use super::error::{ConfigError, ConfigResult};
use crate::scanner::PortScanner;
use crate::transport::{LinkConfig, SerialTransport, TimingConfig, TransportBuilder};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Log levels accepted in `[logging] level`.
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device, speed and hardware tags
    pub link: LinkConfig,
    /// Timeout model
    pub timing: TimingConfig,
    /// Device lock files
    pub lock: LockConfig,
    /// Port discovery
    pub scan: ScanConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Check values serde cannot reject on its own.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.timing.default_timeout.is_zero() {
            return Err(ConfigError::invalid(
                "timing.default_timeout_ms",
                "must be greater than zero",
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::invalid(
                "logging.level",
                format!("expected one of {}", LOG_LEVELS.join(", ")),
            ));
        }
        Ok(())
    }

    /// Transport builder wired with this configuration's lock directory,
    /// scan root and timing.
    pub fn transport_builder(&self) -> TransportBuilder {
        SerialTransport::builder(self.link.clone())
            .lock_dir(self.lock.dir())
            .scanner(self.scan.scanner())
            .timing(self.timing)
    }
}

/// Lock file configuration section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Directory for `LCK..` files; the system temp dir when unset
    pub dir: Option<PathBuf>,
}

impl LockConfig {
    pub fn dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Port discovery configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory holding device nodes
    pub root: PathBuf,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/dev"),
        }
    }
}

impl ScanConfig {
    pub fn scanner(&self) -> PortScanner {
        PortScanner::with_root(&self.root)
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}
