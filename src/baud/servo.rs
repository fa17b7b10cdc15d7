//! Effective baud rate selection for servo buses.
//!
//! Servo configuration tools usually express speed as a "baudnum", an index
//! into a per-family table stored in the servo's control table. Values
//! below [`BAUDNUM_LIMIT`] are treated as such an index; anything else is a
//! rate in bits per second. The result is then clamped to what the USB
//! adapter can carry.

use crate::device::{AdapterKind, ServoFamily};
use tracing::warn;

/// Requests below this value are baudnums, not rates.
pub const BAUDNUM_LIMIT: u32 = 255;

/// Dynamixel protocol v1 baudnum (DX, AX, RX/EX/MX series).
pub fn dynamixel_v1_baudrate(baudnum: u32) -> Option<u32> {
    match baudnum {
        0..=249 => Some(2_000_000 / (baudnum + 1)),
        250 => Some(2_250_000),
        251 => Some(2_500_000),
        252 => Some(3_000_000),
        _ => None,
    }
}

/// Dynamixel XL-320 baudnum.
pub fn dynamixel_xl320_baudrate(baudnum: u32) -> Option<u32> {
    match baudnum {
        0 => Some(9_600),
        1 => Some(57_600),
        2 => Some(115_200),
        3 => Some(1_000_000),
        _ => None,
    }
}

/// Dynamixel X and PRO series baudnum (protocol v2).
pub fn dynamixel_v2_baudrate(baudnum: u32, family: ServoFamily) -> Option<u32> {
    match baudnum {
        0 => Some(9_600),
        1 => Some(57_600),
        2 => Some(115_200),
        3 => Some(1_000_000),
        4 => Some(2_000_000),
        5 => Some(3_000_000),
        6 => Some(4_000_000),
        7 => Some(4_500_000),
        8 if family == ServoFamily::Pro => Some(10_500_000),
        _ => None,
    }
}

/// HerkuleX baudnum.
pub fn herkulex_baudrate(baudnum: u32) -> Option<u32> {
    match baudnum {
        0x02 => Some(666_666),
        0x03 => Some(500_000),
        0x04 => Some(400_000),
        0x07 => Some(250_000),
        0x09 => Some(200_000),
        0x10 => Some(115_200),
        0x22 => Some(57_600),
        _ => None,
    }
}

fn baudnum_to_rate(baudnum: u32, family: ServoFamily) -> Option<u32> {
    match family {
        ServoFamily::Dx | ServoFamily::Ax | ServoFamily::Rx => dynamixel_v1_baudrate(baudnum),
        ServoFamily::Xl => dynamixel_xl320_baudrate(baudnum),
        ServoFamily::X | ServoFamily::Pro => dynamixel_v2_baudrate(baudnum, family),
        ServoFamily::Herkulex => herkulex_baudrate(baudnum),
        ServoFamily::Unknown => None,
    }
}

/// Range of plain rates accepted for a family.
fn accepted_rates(family: ServoFamily) -> std::ops::RangeInclusive<u32> {
    if family == ServoFamily::Herkulex {
        57_600..=1_000_000
    } else if family.is_dynamixel() {
        2_400..=10_500_000
    } else {
        2_400..=1_000_000
    }
}

/// Turn a requested rate or baudnum into the rate the link should run at.
///
/// Invalid requests fall back to the family's factory rate; both fallbacks
/// and adapter clamping are logged.
pub fn select_baud_rate(requested: u32, family: ServoFamily, adapter: AdapterKind) -> u32 {
    let default_rate = family.default_baud_rate();

    let mut rate = if requested < BAUDNUM_LIMIT && family != ServoFamily::Unknown {
        baudnum_to_rate(requested, family).unwrap_or_else(|| {
            warn!(
                "Invalid baudnum {} for {} devices, using default baud rate of {} bps",
                requested, family, default_rate
            );
            default_rate
        })
    } else if accepted_rates(family).contains(&requested) {
        requested
    } else {
        warn!(
            "Invalid baud rate {} bps for {} devices, using default baud rate of {} bps",
            requested, family, default_rate
        );
        default_rate
    };

    if let Some(max) = adapter.max_baud_rate() {
        if rate > max {
            warn!(
                "Baud rate {} bps too high for {:?} adapter, clamping to {} bps",
                rate, adapter, max
            );
            rate = max;
        }
    }

    rate
}
