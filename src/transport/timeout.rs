//! Deadline bookkeeping for blocking transfers.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Default adapter latency, the FTDI `latency_timer` factory value.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(16);

/// Latency values accepted by `set_latency`.
pub const LATENCY_RANGE: std::ops::RangeInclusive<Duration> =
    Duration::from_millis(1)..=Duration::from_millis(128);

/// Knobs of the packet timeout formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Deadline used by `rx` when none was armed.
    #[serde(rename = "default_timeout_ms", with = "millis")]
    pub default_timeout: Duration,
    /// Fixed slack added to every packet timeout.
    #[serde(rename = "protocol_margin_ms", with = "millis")]
    pub protocol_margin: Duration,
    /// Initial adapter latency; counted twice (request and reply).
    #[serde(rename = "latency_ms", with = "millis")]
    pub latency: Duration,
    /// Extra idle time assumed between consecutive bytes.
    #[serde(rename = "inter_byte_gap_us", with = "micros")]
    pub inter_byte_gap: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_millis(1000),
            protocol_margin: Duration::from_millis(2),
            latency: DEFAULT_LATENCY,
            inter_byte_gap: Duration::ZERO,
        }
    }
}

impl TimingConfig {
    /// Time needed to move `packet_len` bytes at `baud_rate`, where each
    /// byte occupies `bits_per_frame` bit times, plus the latency and
    /// protocol margins.
    pub fn packet_timeout(
        &self,
        packet_len: usize,
        baud_rate: u32,
        bits_per_frame: u32,
        latency: Duration,
    ) -> Duration {
        let baud = u128::from(baud_rate.max(1));
        let bits = u128::from(bits_per_frame) * packet_len as u128;
        let transfer_nanos = bits * 1_000_000_000 / baud;
        let transfer = Duration::from_nanos(u64::try_from(transfer_nanos).unwrap_or(u64::MAX));

        let count = u32::try_from(packet_len).unwrap_or(u32::MAX);
        let gaps = self.inter_byte_gap.saturating_mul(count);

        transfer
            .saturating_add(gaps)
            .saturating_add(latency.saturating_mul(2))
            .saturating_add(self.protocol_margin)
    }
}

/// One armed deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutState {
    armed_at: Instant,
    deadline: Instant,
}

impl TimeoutState {
    /// Arm a deadline `duration` from now.
    pub fn arm(duration: Duration) -> Self {
        let armed_at = Instant::now();
        let deadline = armed_at
            .checked_add(duration)
            .unwrap_or(armed_at + Duration::from_secs(86_400));
        Self { armed_at, deadline }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Length of the armed window.
    pub fn duration(&self) -> Duration {
        self.deadline - self.armed_at
    }

    /// Time since the deadline was armed.
    pub fn elapsed(&self) -> Duration {
        self.armed_at.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

mod micros {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_micros() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_micros)
    }
}
