//! Errors raised while loading, overriding or saving `servo-link.toml`.

use std::path::PathBuf;
use thiserror::Error;

/// Why a configuration could not be produced or stored.
///
/// Keys are reported the way they appear in the TOML file
/// (`section.key`, e.g. `timing.default_timeout_ms`); overrides are
/// reported by their full `SERVO_LINK_*` variable name.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a valid servo-link config: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot encode configuration as TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value that parsed but is out of range, e.g. a zero timeout.
    #[error("{key} {message}")]
    Invalid { key: String, message: String },

    /// A `SERVO_LINK_<SECTION>_<KEY>` override that does not parse.
    #[error("{var}={value:?}: {message}")]
    Env {
        var: String,
        value: String,
        message: String,
    },

    /// `save` on a loader that was not created from a file.
    #[error("no configuration file to save to; use save_to with a path")]
    NoConfigPath,
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn env(
        var: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Env {
            var: var.into(),
            value: value.into(),
            message: message.into(),
        }
    }

    /// The TOML key or environment variable at fault, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Invalid { key, .. } => Some(key),
            Self::Env { var, .. } => Some(var),
            _ => None,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
