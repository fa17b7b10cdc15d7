//! Link construction parameters.

use crate::device::{AdapterKind, ServoFamily};
use serde::{Deserialize, Serialize};

/// Device path sentinel: scan and take the first candidate.
pub const AUTO_DEVICE: &str = "auto";

/// What to open and how fast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Device node path, or `"auto"`.
    pub device: String,
    /// Rate in bits per second, or a servo baudnum below 255.
    pub baud: u32,
    /// USB/TTL converter in use.
    pub adapter: AdapterKind,
    /// Servo product line on the bus.
    pub servo: ServoFamily,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device: AUTO_DEVICE.to_string(),
            baud: 57_600,
            adapter: AdapterKind::Unknown,
            servo: ServoFamily::Unknown,
        }
    }
}

impl LinkConfig {
    pub fn new(device: impl Into<String>, baud: u32) -> Self {
        Self {
            device: device.into(),
            baud,
            ..Default::default()
        }
    }

    pub fn with_adapter(mut self, adapter: AdapterKind) -> Self {
        self.adapter = adapter;
        self
    }

    pub fn with_servo(mut self, servo: ServoFamily) -> Self {
        self.servo = servo;
        self
    }

    pub fn is_auto(&self) -> bool {
        self.device.eq_ignore_ascii_case(AUTO_DEVICE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = LinkConfig::new("/dev/ttyUSB0", 1)
            .with_servo(ServoFamily::Ax)
            .with_adapter(AdapterKind::Usb2Dynamixel);

        assert_eq!(config.device, "/dev/ttyUSB0");
        assert_eq!(config.baud, 1);
        assert_eq!(config.servo, ServoFamily::Ax);
        assert!(!config.is_auto());
        assert!(LinkConfig::new("AUTO", 9600).is_auto());
    }

    #[test]
    fn test_partial_deserialization() {
        let config: LinkConfig = toml::from_str(
            r#"
            device = "/dev/ttyACM0"
            servo = "x"
            "#,
        )
        .unwrap();
        assert_eq!(config.device, "/dev/ttyACM0");
        assert_eq!(config.servo, ServoFamily::X);
        assert_eq!(config.baud, 57_600);
        assert_eq!(config.adapter, AdapterKind::Unknown);
    }
}
