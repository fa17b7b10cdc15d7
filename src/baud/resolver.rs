//! Mapping from numeric baud rates to platform speed identifiers.
//!
//! A UART can only be clocked at rates its divisor can reach, so the
//! standard table is matched with a tolerance. Anything outside the band
//! becomes a custom speed that the OS has to program separately.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Relative distance from a table entry still accepted as that entry.
pub const BAUD_RATE_TOLERANCE: f64 = 0.015;

/// Standard speeds selectable with a discrete flag, in ascending order.
pub const STANDARD_BAUD_RATES: &[u32] = &[
    50, 75, 110, 134, 150, 200, 300, 600, 1200, 1800, 2400, 4800, 9600, 19200, 38400, 57600,
    115200, 230400, 460800, 500000, 576000, 921600, 1000000, 1152000, 1500000, 2000000, 2500000,
    3000000, 3500000, 4000000,
];

/// Resolved line speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rate", rename_all = "lowercase")]
pub enum BaudRateFlag {
    /// One of [`STANDARD_BAUD_RATES`].
    Standard(u32),
    /// No table entry within tolerance; carries the exact requested rate.
    Custom(u32),
}

impl BaudRateFlag {
    /// The rate the port should be programmed with.
    pub fn rate(self) -> u32 {
        match self {
            BaudRateFlag::Standard(rate) | BaudRateFlag::Custom(rate) => rate,
        }
    }

    pub fn is_custom(self) -> bool {
        matches!(self, BaudRateFlag::Custom(_))
    }

    /// The `termios` speed constant for a standard rate.
    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub fn termios_speed(self) -> Option<libc::speed_t> {
        let BaudRateFlag::Standard(rate) = self else {
            return None;
        };
        let speed = match rate {
            50 => libc::B50,
            75 => libc::B75,
            110 => libc::B110,
            134 => libc::B134,
            150 => libc::B150,
            200 => libc::B200,
            300 => libc::B300,
            600 => libc::B600,
            1200 => libc::B1200,
            1800 => libc::B1800,
            2400 => libc::B2400,
            4800 => libc::B4800,
            9600 => libc::B9600,
            19200 => libc::B19200,
            38400 => libc::B38400,
            57600 => libc::B57600,
            115200 => libc::B115200,
            230400 => libc::B230400,
            460800 => libc::B460800,
            500000 => libc::B500000,
            576000 => libc::B576000,
            921600 => libc::B921600,
            1000000 => libc::B1000000,
            1152000 => libc::B1152000,
            1500000 => libc::B1500000,
            2000000 => libc::B2000000,
            2500000 => libc::B2500000,
            3000000 => libc::B3000000,
            3500000 => libc::B3500000,
            4000000 => libc::B4000000,
            _ => return None,
        };
        Some(speed)
    }
}

impl fmt::Display for BaudRateFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaudRateFlag::Standard(rate) => write!(f, "B{}", rate),
            BaudRateFlag::Custom(rate) => write!(f, "custom({})", rate),
        }
    }
}

/// Matches requested rates against [`STANDARD_BAUD_RATES`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaudRateResolver {
    tolerance: f64,
}

impl Default for BaudRateResolver {
    fn default() -> Self {
        Self {
            tolerance: BAUD_RATE_TOLERANCE,
        }
    }
}

impl BaudRateResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver with a different relative tolerance. Negative and NaN
    /// values collapse to an exact-match resolver.
    pub fn with_tolerance(tolerance: f64) -> Self {
        let tolerance = if tolerance.is_finite() && tolerance > 0.0 {
            tolerance
        } else {
            0.0
        };
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Nearest table entry within tolerance, or the custom-speed sentinel.
    pub fn resolve(&self, requested: u32) -> BaudRateFlag {
        let requested_f = f64::from(requested);

        STANDARD_BAUD_RATES
            .iter()
            .map(|&rate| (rate, (requested_f - f64::from(rate)).abs()))
            .filter(|&(rate, distance)| distance <= f64::from(rate) * self.tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(rate, _)| BaudRateFlag::Standard(rate))
            .unwrap_or(BaudRateFlag::Custom(requested))
    }
}

/// [`BaudRateResolver::resolve`] with the default tolerance.
pub fn resolve(requested: u32) -> BaudRateFlag {
    BaudRateResolver::default().resolve(requested)
}
