//! Adapter and servo-family tags carried by a link configuration.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// USB/TTL converter sitting between the host and the servo bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AdapterKind {
    /// Adapter not known; no bandwidth restriction applied.
    #[default]
    Unknown,
    /// ROBOTIS USB2Dynamixel (FTDI FT232R).
    Usb2Dynamixel,
    /// Xevelabs USB2AX (ATmega32u4 CDC-ACM).
    Usb2Ax,
    /// ROBOTIS ZIG-100/110A wireless bridge.
    Zig100,
    /// Any other FTDI-based converter.
    OtherFtdi,
    /// Anything else.
    Other,
}

impl AdapterKind {
    /// Highest rate the converter chip can carry, if it is limited.
    pub fn max_baud_rate(self) -> Option<u32> {
        match self {
            AdapterKind::Usb2Dynamixel | AdapterKind::OtherFtdi => Some(4_500_000),
            AdapterKind::Usb2Ax => Some(1_000_000),
            AdapterKind::Zig100 => Some(115_200),
            AdapterKind::Unknown | AdapterKind::Other => None,
        }
    }
}

/// Servo product line driven over the link.
///
/// Ordering follows the product lines, oldest Dynamixel first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ServoFamily {
    #[default]
    Unknown,
    /// Dynamixel DX series.
    Dx,
    /// Dynamixel AX series.
    Ax,
    /// Dynamixel RX, EX and MX series.
    Rx,
    /// Dynamixel XL-320.
    Xl,
    /// Dynamixel X series (protocol v2).
    X,
    /// Dynamixel PRO series.
    Pro,
    /// Dongbu HerkuleX.
    Herkulex,
}

impl ServoFamily {
    pub fn is_dynamixel(self) -> bool {
        matches!(
            self,
            ServoFamily::Dx
                | ServoFamily::Ax
                | ServoFamily::Rx
                | ServoFamily::Xl
                | ServoFamily::X
                | ServoFamily::Pro
        )
    }

    /// Factory baud rate of the family.
    pub fn default_baud_rate(self) -> u32 {
        match self {
            ServoFamily::Herkulex => 115_200,
            ServoFamily::Xl | ServoFamily::Ax => 1_000_000,
            ServoFamily::Dx
            | ServoFamily::Rx
            | ServoFamily::X
            | ServoFamily::Pro
            | ServoFamily::Unknown => 57_600,
        }
    }
}

impl fmt::Display for ServoFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServoFamily::Unknown => "unknown",
            ServoFamily::Dx => "Dynamixel DX",
            ServoFamily::Ax => "Dynamixel AX",
            ServoFamily::Rx => "Dynamixel RX/EX/MX",
            ServoFamily::Xl => "Dynamixel XL-320",
            ServoFamily::X => "Dynamixel X",
            ServoFamily::Pro => "Dynamixel PRO",
            ServoFamily::Herkulex => "HerkuleX",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_defaults() {
        assert_eq!(ServoFamily::Herkulex.default_baud_rate(), 115_200);
        assert_eq!(ServoFamily::Ax.default_baud_rate(), 1_000_000);
        assert_eq!(ServoFamily::Xl.default_baud_rate(), 1_000_000);
        assert_eq!(ServoFamily::Rx.default_baud_rate(), 57_600);
        assert_eq!(ServoFamily::Unknown.default_baud_rate(), 57_600);
    }

    #[test]
    fn test_dynamixel_membership() {
        assert!(ServoFamily::Pro.is_dynamixel());
        assert!(!ServoFamily::Herkulex.is_dynamixel());
        assert!(!ServoFamily::Unknown.is_dynamixel());
    }

    #[test]
    fn test_adapter_caps() {
        assert_eq!(AdapterKind::Usb2Ax.max_baud_rate(), Some(1_000_000));
        assert_eq!(AdapterKind::Zig100.max_baud_rate(), Some(115_200));
        assert_eq!(AdapterKind::Unknown.max_baud_rate(), None);
    }

    #[test]
    fn test_serde_names() {
        let family: ServoFamily = serde_json::from_str("\"herkulex\"").unwrap();
        assert_eq!(family, ServoFamily::Herkulex);

        let adapter: AdapterKind = serde_json::from_str("\"usb2-dynamixel\"").unwrap();
        assert_eq!(adapter, AdapterKind::Usb2Dynamixel);
    }
}
