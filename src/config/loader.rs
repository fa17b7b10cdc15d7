//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, LogFormat};
use crate::device::{AdapterKind, ServoFamily};
use clap::ValueEnum;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "SERVO_LINK";

/// Config file name
const CONFIG_FILE_NAME: &str = "servo-link.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "SERVO_LINK_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `SERVO_LINK_CONFIG` environment variable (explicit path)
    /// 2. `./servo-link.toml` (current directory)
    /// 3. The platform config directory (`~/.config/servo-link/` on Linux)
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables can override any config file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Built-in defaults with `SERVO_LINK_*` overrides applied, ignoring
    /// any config file. A malformed override is an error, not a reset.
    pub fn with_defaults() -> ConfigResult<Self> {
        let mut config = Config::default();
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: None,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to file.
    pub fn save(&self) -> ConfigResult<()> {
        let path = self.config_path.as_ref().ok_or(ConfigError::NoConfigPath)?;

        save_to_file(&self.config, path)
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }

    /// Reload configuration from file (if path is set).
    pub fn reload(&mut self) -> ConfigResult<()> {
        if let Some(ref path) = self.config_path {
            let mut config = load_from_file(path)?;
            apply_env_overrides(&mut config)?;
            config.validate()?;
            self.config = config;
        }
        Ok(())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. Platform config directory
    if let Some(app_config) = get_default_config_path() {
        if app_config.exists() {
            return Some(app_config);
        }
    }

    // 4. No config file found - will use defaults
    None
}

/// Get the default config directory for creating new config files.
pub fn get_default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "servo-link").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    debug!("Loading configuration from {}", path.display());
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Save configuration to a file.
fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn env_var(key: &str) -> Option<(String, String)> {
    let var = format!("{}_{}", ENV_PREFIX, key);
    std::env::var(&var).ok().map(|val| (var, val))
}

fn parse_env<T: FromStr>(var: &str, val: &str, what: &str) -> ConfigResult<T> {
    val.trim()
        .parse()
        .map_err(|_| ConfigError::env(var, val, format!("invalid {}", what)))
}

fn parse_enum<T: ValueEnum>(var: &str, val: &str) -> ConfigResult<T> {
    T::from_str(val.trim(), true).map_err(|message| ConfigError::env(var, val, message))
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `SERVO_LINK_<SECTION>_<KEY>`
/// For example:
/// - `SERVO_LINK_LINK_DEVICE=/dev/ttyUSB0`
/// - `SERVO_LINK_LINK_BAUD=1000000`
/// - `SERVO_LINK_TIMING_LATENCY_MS=4`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Link overrides
    if let Some((_, val)) = env_var("LINK_DEVICE") {
        config.link.device = val;
    }
    if let Some((var, val)) = env_var("LINK_BAUD") {
        config.link.baud = parse_env(&var, &val, "baud rate")?;
    }
    if let Some((var, val)) = env_var("LINK_ADAPTER") {
        config.link.adapter = parse_enum::<AdapterKind>(&var, &val)?;
    }
    if let Some((var, val)) = env_var("LINK_SERVO") {
        config.link.servo = parse_enum::<ServoFamily>(&var, &val)?;
    }

    // Timing overrides
    if let Some((var, val)) = env_var("TIMING_DEFAULT_TIMEOUT_MS") {
        config.timing.default_timeout = Duration::from_millis(parse_env(&var, &val, "timeout")?);
    }
    if let Some((var, val)) = env_var("TIMING_PROTOCOL_MARGIN_MS") {
        config.timing.protocol_margin = Duration::from_millis(parse_env(&var, &val, "margin")?);
    }
    if let Some((var, val)) = env_var("TIMING_LATENCY_MS") {
        config.timing.latency = Duration::from_millis(parse_env(&var, &val, "latency")?);
    }
    if let Some((var, val)) = env_var("TIMING_INTER_BYTE_GAP_US") {
        config.timing.inter_byte_gap = Duration::from_micros(parse_env(&var, &val, "gap")?);
    }

    // Lock and scan overrides
    if let Some((_, val)) = env_var("LOCK_DIR") {
        config.lock.dir = Some(PathBuf::from(val));
    }
    if let Some((_, val)) = env_var("SCAN_ROOT") {
        config.scan.root = PathBuf::from(val);
    }

    // Logging overrides
    if let Some((_, val)) = env_var("LOGGING_LEVEL") {
        config.logging.level = val;
    }
    if let Some((var, val)) = env_var("LOGGING_FORMAT") {
        config.logging.format = match val.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            _ => {
                return Err(ConfigError::env(
                    var,
                    val,
                    "expected json, pretty or compact",
                ))
            }
        };
    }

    Ok(())
}
