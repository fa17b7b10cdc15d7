//! Discovery of USB/TTL serial adapters.
//!
//! Only USB-serial and CDC-ACM device nodes are reported. Fixed on-board
//! ports (`ttyS*`) are skipped because the kernel creates them whether or
//! not anything is attached, so they would always look like valid
//! candidates.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// What kind of adapter a device node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceClass {
    /// USB-serial bridge chips (FTDI, CP210x, CH340, ...).
    UsbSerial,
    /// CDC-ACM devices (USB2AX, OpenCM, Arduino-style boards).
    AcmSerial,
    /// Anything the OS reports that fits neither pattern.
    Other,
}

/// One candidate device found by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortDescriptor {
    path: String,
    class: DeviceClass,
}

impl PortDescriptor {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn class(&self) -> DeviceClass {
        self.class
    }
}

static NODE_PATTERNS: Lazy<Vec<(Regex, DeviceClass)>> = Lazy::new(|| {
    [
        (r"^ttyUSB[0-9]+$", DeviceClass::UsbSerial),
        (r"^(tty|cu)\.usbserial.*$", DeviceClass::UsbSerial),
        (r"^ttyACM[0-9]+$", DeviceClass::AcmSerial),
        (r"^(tty|cu)\.usbmodem.*$", DeviceClass::AcmSerial),
    ]
    .into_iter()
    .filter_map(|(pattern, class)| Regex::new(pattern).ok().map(|re| (re, class)))
    .collect()
});

static FIXED_PORT: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^ttyS[0-9]+$").ok());

/// Classify a device node file name. Fixed serial ports never match.
pub fn classify(name: &str) -> Option<DeviceClass> {
    if FIXED_PORT.as_ref().is_some_and(|re| re.is_match(name)) {
        return None;
    }
    NODE_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(name))
        .map(|(_, class)| *class)
}

/// Filesystem walker for serial device nodes.
#[derive(Debug, Clone)]
pub struct PortScanner {
    root: PathBuf,
}

impl Default for PortScanner {
    fn default() -> Self {
        Self::with_root("/dev")
    }
}

impl PortScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `root` instead of `/dev`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every USB-serial and ACM-serial node, in directory order.
    pub fn scan(&self) -> Vec<PortDescriptor> {
        let ports = self.scan_nodes();

        #[cfg(windows)]
        let ports = if ports.is_empty() {
            scan_system_ports()
        } else {
            ports
        };

        if ports.is_empty() {
            warn!("No serial ports found during scan of {}", self.root.display());
        } else {
            debug!("Scan of {} found {} port(s)", self.root.display(), ports.len());
        }
        ports
    }

    /// Path of the first scanned port, used for the `auto` device path.
    pub fn autoselect(&self) -> Option<String> {
        self.scan().into_iter().next().map(|p| p.path)
    }

    fn scan_nodes(&self) -> Vec<PortDescriptor> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot read {}: {}", self.root.display(), e);
                return Vec::new();
            }
        };

        entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name();
                let class = classify(name.to_str()?)?;
                Some(PortDescriptor {
                    path: entry.path().to_string_lossy().into_owned(),
                    class,
                })
            })
            .collect()
    }
}

#[cfg(windows)]
fn scan_system_ports() -> Vec<PortDescriptor> {
    serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(|info| {
            let class = match info.port_type {
                serialport::SerialPortType::UsbPort(_) => DeviceClass::UsbSerial,
                _ => DeviceClass::Other,
            };
            PortDescriptor {
                path: info.port_name,
                class,
            }
        })
        .collect()
}
