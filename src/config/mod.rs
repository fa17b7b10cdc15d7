//! Configuration module for servo-link.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `SERVO_LINK_CONFIG` environment variable (explicit path)
//! 2. `./servo-link.toml` (current directory)
//! 3. `~/.config/servo-link/servo-link.toml` (XDG on Linux)
//! 4. `%APPDATA%\servo-link\config\servo-link.toml` (Windows)
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Any configuration value can be overridden via environment variables.
//! The pattern is: `SERVO_LINK_<SECTION>_<KEY>`
//!
//! Examples:
//! - `SERVO_LINK_LINK_DEVICE=/dev/ttyUSB0`
//! - `SERVO_LINK_LINK_SERVO=ax`
//! - `SERVO_LINK_LOCK_DIR=/run/lock`
//!
//! # Example
//!
//! ```rust,no_run
//! use servo_link::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//! println!("Device: {} @ {}", config.link.device, config.link.baud);
//!
//! let mut link = config.transport_builder().build();
//! link.open_link()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{Config, LockConfig, LogFormat, LoggingConfig, ScanConfig};
