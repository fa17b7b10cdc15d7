use criterion::{black_box, criterion_group, criterion_main, Criterion};
use servo_link::baud::{select_baud_rate, BaudRateResolver};
use servo_link::{AdapterKind, ServoFamily, TimingConfig};
use std::time::Duration;

pub fn bench_resolve(c: &mut Criterion) {
    let resolver = BaudRateResolver::default();
    c.bench_function("resolve_standard_and_custom", |b| {
        b.iter(|| {
            for rate in [9_600u32, 57_600, 117_647, 250_000, 1_000_000, 3_000_000] {
                black_box(resolver.resolve(black_box(rate)));
            }
        })
    });
}

pub fn bench_select_baud_rate(c: &mut Criterion) {
    c.bench_function("select_baud_rate_baudnum", |b| {
        b.iter(|| {
            for baudnum in 0..=black_box(254u32) {
                black_box(select_baud_rate(baudnum, ServoFamily::Rx, AdapterKind::Usb2Ax));
            }
        })
    });
}

pub fn bench_packet_timeout(c: &mut Criterion) {
    let timing = TimingConfig::default();
    c.bench_function("packet_timeout", |b| {
        b.iter(|| {
            black_box(timing.packet_timeout(
                black_box(143),
                black_box(1_000_000),
                10,
                Duration::from_millis(1),
            ))
        })
    });
}

criterion_group!{
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(300))
        .measurement_time(Duration::from_secs(2));
    targets = bench_resolve, bench_select_baud_rate, bench_packet_timeout
}
criterion_main!(benches);
