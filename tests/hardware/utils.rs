//! Utility functions for hardware testing.

use servo_link::{LinkConfig, SerialTransport, ServoFamily};
use std::env;

/// Test port configuration from environment.
pub struct TestPortConfig {
    pub port_name: String,
    pub baud_rate: u32,
    pub servo: ServoFamily,
    pub loopback_enabled: bool,
}

impl TestPortConfig {
    /// Get test configuration from environment variables.
    ///
    /// `TEST_PORT` names the device (or `auto`), `TEST_BAUD` the rate or
    /// baudnum, `TEST_SERVO` the servo family and `TEST_LOOPBACK=1` marks
    /// TX wired to RX.
    pub fn from_env() -> Option<Self> {
        let port_name = env::var("TEST_PORT").ok()?;
        let baud_rate = env::var("TEST_BAUD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(57_600);
        let servo = env::var("TEST_SERVO")
            .ok()
            .and_then(|s| <ServoFamily as clap::ValueEnum>::from_str(&s, true).ok())
            .unwrap_or_default();
        let loopback_enabled = env::var("TEST_LOOPBACK").ok().as_deref() == Some("1");

        Some(TestPortConfig {
            port_name,
            baud_rate,
            servo,
            loopback_enabled,
        })
    }

    pub fn link_config(&self) -> LinkConfig {
        LinkConfig::new(&self.port_name, self.baud_rate).with_servo(self.servo)
    }

    /// Transport on the real device, locking in a private directory.
    pub fn transport(&self, lock_dir: &std::path::Path) -> SerialTransport {
        SerialTransport::builder(self.link_config())
            .lock_dir(lock_dir)
            .build()
    }
}

/// Skip the calling test when no hardware is configured.
#[macro_export]
macro_rules! require_port {
    () => {
        match $crate::hardware::utils::TestPortConfig::from_env() {
            Some(config) => config,
            None => {
                eprintln!("TEST_PORT not set, skipping");
                return;
            }
        }
    };
}
