//! Property checks for baud rate resolution and effective rate selection.

use proptest::prelude::*;
use servo_link::baud::{resolve, select_baud_rate, BAUD_RATE_TOLERANCE, STANDARD_BAUD_RATES};
use servo_link::{AdapterKind, BaudRateFlag, ServoFamily, TimingConfig};
use std::time::Duration;

fn any_family() -> impl Strategy<Value = ServoFamily> {
    prop_oneof![
        Just(ServoFamily::Unknown),
        Just(ServoFamily::Dx),
        Just(ServoFamily::Ax),
        Just(ServoFamily::Rx),
        Just(ServoFamily::Xl),
        Just(ServoFamily::X),
        Just(ServoFamily::Pro),
        Just(ServoFamily::Herkulex),
    ]
}

fn any_adapter() -> impl Strategy<Value = AdapterKind> {
    prop_oneof![
        Just(AdapterKind::Unknown),
        Just(AdapterKind::Usb2Dynamixel),
        Just(AdapterKind::Usb2Ax),
        Just(AdapterKind::Zig100),
        Just(AdapterKind::OtherFtdi),
        Just(AdapterKind::Other),
    ]
}

proptest! {
    #[test]
    fn resolve_is_total(requested in any::<u32>()) {
        match resolve(requested) {
            BaudRateFlag::Standard(rate) => {
                prop_assert!(STANDARD_BAUD_RATES.contains(&rate));
                let distance = (f64::from(requested) - f64::from(rate)).abs();
                prop_assert!(distance <= f64::from(rate) * BAUD_RATE_TOLERANCE);
            }
            BaudRateFlag::Custom(rate) => {
                prop_assert_eq!(rate, requested);
                for &standard in STANDARD_BAUD_RATES {
                    let distance = (f64::from(requested) - f64::from(standard)).abs();
                    prop_assert!(distance > f64::from(standard) * BAUD_RATE_TOLERANCE);
                }
            }
        }
    }

    #[test]
    fn standard_rates_resolve_to_themselves(index in 0..STANDARD_BAUD_RATES.len()) {
        let rate = STANDARD_BAUD_RATES[index];
        prop_assert_eq!(resolve(rate), BaudRateFlag::Standard(rate));
    }

    #[test]
    fn selected_rate_respects_adapter_cap(
        requested in any::<u32>(),
        family in any_family(),
        adapter in any_adapter(),
    ) {
        let rate = select_baud_rate(requested, family, adapter);
        prop_assert!(rate > 0);
        if let Some(max) = adapter.max_baud_rate() {
            prop_assert!(rate <= max);
        }
    }

    #[test]
    fn packet_timeout_grows_with_length(len in 0usize..4096, baud in 2_400u32..=4_500_000) {
        let timing = TimingConfig::default();
        let latency = Duration::from_millis(1);
        let shorter = timing.packet_timeout(len, baud, 10, latency);
        let longer = timing.packet_timeout(len + 1, baud, 10, latency);

        prop_assert!(longer >= shorter);
        prop_assert!(shorter >= latency * 2 + timing.protocol_margin);
    }
}
