//! Shared test utilities for servo-link tests.
//!
//! This module provides common test infrastructure including:
//! - Mock-backed transports sharing one lock directory
//! - Fake `/dev` trees for the scanner
//! - Hand-written lock files for stale-owner scenarios

#![allow(dead_code)]

use servo_link::port::{MockConnector, MockSerialPort};
use servo_link::{DeviceLock, LinkConfig, SerialTransport, TimingConfig};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

/// Device path used by mock transports.
pub const MOCK_DEVICE: &str = "/dev/ttyUSB0";

/// PID far above any kernel `pid_max`, so never a live process.
pub const DEAD_PID: u32 = 0x7FFF_FFF0;

/// Lock directory that disappears with the test.
pub fn lock_dir() -> TempDir {
    tempfile::tempdir().expect("create lock dir")
}

/// Transport over `connector` at 1 Mbps, locking in `dir`.
pub fn mock_transport(dir: &Path, connector: &MockConnector) -> SerialTransport {
    mock_transport_at(dir, connector, 1_000_000)
}

pub fn mock_transport_at(dir: &Path, connector: &MockConnector, baud: u32) -> SerialTransport {
    SerialTransport::builder(LinkConfig::new(MOCK_DEVICE, baud))
        .connector(connector.clone())
        .lock_dir(dir)
        .timing(TimingConfig {
            default_timeout: Duration::from_millis(50),
            ..Default::default()
        })
        .build()
}

/// Connector handing out a loopback mock.
pub fn loopback_connector() -> MockConnector {
    MockConnector::new(MockSerialPort::loopback("MOCK0"))
}

/// Create a mock serial port with pre-programmed responses.
pub fn create_mock_port_with_responses(port_name: &str, responses: Vec<&[u8]>) -> MockSerialPort {
    let mut mock = MockSerialPort::new(port_name);
    for response in responses {
        mock.enqueue_read(response);
    }
    mock
}

/// Write a lock file for `device` as if `pid` had created it.
pub fn plant_lock(dir: &Path, device: &str, pid: u32) {
    let path = DeviceLock::new(dir).lock_path(device);
    fs::write(path, format!("{:>10}\n", pid)).expect("write lock file");
}

/// Fake device directory holding empty files with the given names.
pub fn fake_dev(names: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().expect("create fake dev");
    for name in names {
        fs::write(dir.path().join(name), b"").expect("create fake node");
    }
    dir
}
