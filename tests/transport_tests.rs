//! Transport behavior against mock adapters: locking, transfers and deadlines.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use servo_link::port::{MockConnector, MockOpenFailure, MockSerialPort, SerialPortAdapter};
use servo_link::{
    BaudRateFlag, DeviceLock, LinkConfig, LinkError, LinkState, OpenError, PortScanner,
    SerialTransport, ServoFamily,
};
use std::time::{Duration, Instant};

const PING: [u8; 6] = [0xFF, 0xFF, 0x01, 0x02, 0x01, 0xFB];

fn lock_exists(dir: &std::path::Path) -> bool {
    DeviceLock::new(dir).lock_path(MOCK_DEVICE).exists()
}

#[test]
fn second_instance_is_locked_out_until_close() {
    let dir = lock_dir();
    let mut first = mock_transport(dir.path(), &loopback_connector());
    let mut second = mock_transport(dir.path(), &loopback_connector());

    first.open_link().unwrap();
    assert!(lock_exists(dir.path()));

    let err = second.open_link().unwrap_err();
    assert!(matches!(err, OpenError::Locked(ref path) if path == MOCK_DEVICE));
    assert!(err.is_contention());
    assert_eq!(second.state(), LinkState::Closed);

    first.close_link();
    assert!(!lock_exists(dir.path()));

    second.open_link().unwrap();
    assert!(second.is_open());
}

#[test]
fn drop_releases_the_lock() {
    let dir = lock_dir();
    {
        let mut link = mock_transport(dir.path(), &loopback_connector());
        link.open_link().unwrap();
        assert!(lock_exists(dir.path()));
    }
    assert!(!lock_exists(dir.path()));
}

#[cfg(unix)]
#[test]
fn stale_lock_is_taken_over() {
    let dir = lock_dir();
    plant_lock(dir.path(), MOCK_DEVICE, DEAD_PID);

    let mut link = mock_transport(dir.path(), &loopback_connector());
    link.open_link().unwrap();
    assert_eq!(
        DeviceLock::new(dir.path()).holder(MOCK_DEVICE),
        Some(std::process::id())
    );
}

#[cfg(unix)]
#[test]
fn lock_of_live_process_blocks_open() {
    let dir = lock_dir();
    // PID 1 always exists; EPERM still counts as alive
    plant_lock(dir.path(), MOCK_DEVICE, 1);

    let connector = loopback_connector();
    let mut link = mock_transport(dir.path(), &connector);
    assert!(matches!(link.open_link(), Err(OpenError::Locked(_))));
    assert!(connector.opened().is_empty());
    assert_eq!(DeviceLock::new(dir.path()).holder(MOCK_DEVICE), Some(1));
}

#[test]
fn failed_open_leaves_no_lock() {
    let dir = lock_dir();
    let connector = loopback_connector();
    let mut link = mock_transport(dir.path(), &connector);

    connector.fail_opens_with(Some(MockOpenFailure::Io));
    assert!(matches!(link.open_link(), Err(OpenError::Os { .. })));
    assert!(!lock_exists(dir.path()));
    assert_eq!(link.state(), LinkState::Closed);

    connector.fail_opens_with(Some(MockOpenFailure::NotFound));
    assert!(matches!(link.open_link(), Err(OpenError::NotFound(_))));
    assert!(!lock_exists(dir.path()));

    connector.fail_opens_with(None);
    link.open_link().unwrap();
    assert!(lock_exists(dir.path()));
}

#[test]
fn custom_speed_needs_platform_support() {
    let dir = lock_dir();
    let connector = loopback_connector().without_custom_speed();
    let mut link = mock_transport_at(dir.path(), &connector, 250_000);

    assert_eq!(link.baud_flag(), BaudRateFlag::Custom(250_000));
    assert!(matches!(
        link.open_link(),
        Err(OpenError::UnsupportedBaud(250_000))
    ));
    assert!(!lock_exists(dir.path()));
    assert!(connector.opened().is_empty());
}

#[test]
fn custom_speed_opens_at_exact_rate() {
    let dir = lock_dir();
    let connector = loopback_connector();
    let mut link = mock_transport_at(dir.path(), &connector, 250_000);

    link.open_link().unwrap();
    assert_eq!(
        connector.opened(),
        vec![(MOCK_DEVICE.to_string(), 250_000)]
    );
}

#[test]
fn near_standard_rate_snaps_to_table() {
    let dir = lock_dir();
    let connector = loopback_connector();
    // Dynamixel baudnum 34 on RX is 2_000_000 / 35 = 57_142 bps, 0.8% off 57_600
    let mut link = SerialTransport::builder(
        LinkConfig::new(MOCK_DEVICE, 34).with_servo(ServoFamily::Rx),
    )
    .connector(connector.clone())
    .lock_dir(dir.path())
    .build();

    assert_eq!(link.baud_rate(), 57_142);
    assert_eq!(link.baud_flag(), BaudRateFlag::Standard(57_600));
    link.open_link().unwrap();
    assert_eq!(connector.opened()[0].1, 57_600);
}

#[test]
fn baudnum_is_converted_before_open() {
    let dir = lock_dir();
    let connector = loopback_connector();
    let mut link = SerialTransport::builder(
        LinkConfig::new(MOCK_DEVICE, 1).with_servo(ServoFamily::Ax),
    )
    .connector(connector.clone())
    .lock_dir(dir.path())
    .build();

    link.open_link().unwrap();
    assert_eq!(connector.opened()[0].1, 1_000_000);
}

#[test]
fn auto_device_with_empty_scan_is_not_found() {
    let dir = lock_dir();
    let dev = fake_dev(&["ttyS0", "ttyS1", "null"]);
    let mut link = SerialTransport::builder(LinkConfig::new("auto", 57_600))
        .connector(loopback_connector())
        .scanner(PortScanner::with_root(dev.path()))
        .lock_dir(dir.path())
        .build();

    assert_eq!(link.device_path(), None);
    assert!(matches!(link.open_link(), Err(OpenError::NotFound(_))));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn auto_device_picks_adapter_over_fixed_port() {
    let dir = lock_dir();
    let dev = fake_dev(&["ttyS0", "ttyUSB3"]);
    let connector = loopback_connector();
    let mut link = SerialTransport::builder(LinkConfig::new("AUTO", 57_600))
        .connector(connector.clone())
        .scanner(PortScanner::with_root(dev.path()))
        .lock_dir(dir.path())
        .build();

    let expected = dev.path().join("ttyUSB3").to_string_lossy().into_owned();
    assert_eq!(link.device_path(), Some(expected.as_str()));
    assert_eq!(link.device_name(), Some("ttyUSB3"));

    link.open_link().unwrap();
    assert_eq!(connector.opened()[0].0, expected);
}

#[test]
fn loopback_round_trip_leaves_nothing_behind() {
    let dir = lock_dir();
    let connector = loopback_connector();
    let mut link = mock_transport(dir.path(), &connector);
    link.open_link().unwrap();

    link.flush();
    assert_eq!(link.tx(&PING).unwrap(), PING.len());
    link.set_timeout_packet(PING.len());

    let mut echo = [0u8; 6];
    assert_eq!(link.rx(&mut echo).unwrap(), 6);
    assert_eq!(echo, PING);
    assert_eq!(connector.port().bytes_to_read(), Some(0));
    assert_eq!(connector.port().get_write_log(), vec![PING.to_vec()]);
}

#[test]
fn flush_discards_pending_input() {
    let dir = lock_dir();
    let connector = loopback_connector();
    let mut link = mock_transport(dir.path(), &connector);
    link.open_link().unwrap();

    link.tx(&PING).unwrap();
    link.flush();
    assert_eq!(connector.port().clear_count(), 1);

    link.set_timeout(Duration::from_millis(10));
    let mut buffer = [0u8; 6];
    assert_eq!(link.rx(&mut buffer).unwrap(), 0);
}

#[test]
fn short_write_reports_accepted_count() {
    let dir = lock_dir();
    let connector = loopback_connector();
    let mut port = connector.port();
    port.set_write_capacity(Some(3));

    let mut link = mock_transport(dir.path(), &connector);
    link.open_link().unwrap();

    assert_eq!(link.tx(&PING).unwrap(), 3);
    assert!(link.is_open());

    port.set_write_capacity(Some(0));
    assert_eq!(link.tx(&PING).unwrap(), 0);
}

#[test]
fn rx_waits_for_full_deadline() {
    let dir = lock_dir();
    let connector = MockConnector::new(MockSerialPort::new("MOCK0"));
    let mut link = mock_transport(dir.path(), &connector);
    link.open_link().unwrap();

    let timeout = Duration::from_millis(40);
    link.set_timeout(timeout);
    let started = Instant::now();
    let mut buffer = [0u8; 8];
    assert_eq!(link.rx(&mut buffer).unwrap(), 0);

    assert!(started.elapsed() >= timeout);
    assert!(link.check_timeout() >= timeout);
    assert!(link.is_timed_out());
    assert!(link.is_open());
}

#[test]
fn rx_returns_partial_packet_on_deadline() {
    let dir = lock_dir();
    let port = create_mock_port_with_responses("MOCK0", vec![&[0xFF, 0xFF, 0x01]]);
    let connector = MockConnector::new(port);
    let mut link = mock_transport(dir.path(), &connector);
    link.open_link().unwrap();

    link.set_timeout(Duration::from_millis(20));
    let mut buffer = [0u8; 6];
    assert_eq!(link.rx(&mut buffer).unwrap(), 3);
    assert_eq!(&buffer[..3], &[0xFF, 0xFF, 0x01]);
}

#[test]
fn rx_after_default_timeout_reads_new_bytes() {
    let dir = lock_dir();
    let connector = MockConnector::new(MockSerialPort::new("MOCK0"));
    let mut link = mock_transport(dir.path(), &connector);
    link.open_link().unwrap();

    let mut buffer = [0u8; 2];
    assert_eq!(link.rx(&mut buffer).unwrap(), 0);
    assert!(link.check_timeout() >= Duration::from_millis(50));

    let mut port = connector.port();
    port.enqueue_read(&[0xAA, 0xBB]);
    assert_eq!(link.rx(&mut buffer).unwrap(), 2);
    assert_eq!(buffer, [0xAA, 0xBB]);
}

#[test]
fn rx_after_explicit_timeout_expires_waits_again() {
    let dir = lock_dir();
    let connector = MockConnector::new(MockSerialPort::new("MOCK0"));
    let mut link = mock_transport(dir.path(), &connector);
    link.open_link().unwrap();

    link.set_timeout(Duration::from_millis(10));
    let mut buffer = [0u8; 4];
    assert_eq!(link.rx(&mut buffer).unwrap(), 0);
    assert!(link.is_timed_out());

    // The next read gets the full default window rather than returning at once
    let started = Instant::now();
    assert_eq!(link.rx(&mut buffer).unwrap(), 0);
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert!(link.check_timeout() >= Duration::from_millis(50));
}

#[test]
fn packet_timeout_bounds_rx() {
    let dir = lock_dir();
    let connector = MockConnector::new(MockSerialPort::new("MOCK0"));
    let mut link = mock_transport_at(dir.path(), &connector, 57_600);
    link.open_link().unwrap();

    link.set_latency(Duration::from_millis(1));
    link.set_timeout_packet(10);
    let started = Instant::now();
    let mut buffer = [0u8; 10];
    assert_eq!(link.rx(&mut buffer).unwrap(), 0);

    // 10 bytes at 57600 8N1 is ~1.74 ms, plus 2 x 1 ms latency and 2 ms margin
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_micros(5_700));
    assert!(elapsed < Duration::from_secs(1));
}

#[test]
fn hard_io_failure_closes_link_and_releases_lock() {
    let dir = lock_dir();
    let connector = loopback_connector();
    let mut link = mock_transport(dir.path(), &connector);
    link.open_link().unwrap();

    connector.port().set_disconnected(true);
    assert!(matches!(link.tx(&PING), Err(LinkError::Io(_))));
    assert!(!link.is_open());
    assert_eq!(link.state(), LinkState::Closed);
    assert!(!lock_exists(dir.path()));

    assert!(matches!(link.tx(&PING), Err(LinkError::NotOpen)));
}

#[test]
fn rx_failure_closes_link() {
    let dir = lock_dir();
    let connector = loopback_connector();
    let mut link = mock_transport(dir.path(), &connector);
    link.open_link().unwrap();

    connector.port().set_disconnected(true);
    let mut buffer = [0u8; 4];
    assert!(matches!(link.rx(&mut buffer), Err(LinkError::Io(_))));
    assert!(!link.is_open());
    assert!(!lock_exists(dir.path()));
}

#[test]
fn transfers_on_closed_link_fail() {
    let dir = lock_dir();
    let mut link = mock_transport(dir.path(), &loopback_connector());

    assert!(matches!(link.tx(&PING), Err(LinkError::NotOpen)));
    let mut buffer = [0u8; 4];
    assert!(matches!(link.rx(&mut buffer), Err(LinkError::NotOpen)));
    link.flush();
    link.close_link();
    assert_eq!(link.state(), LinkState::Closed);
}

#[test]
fn reopen_after_close() {
    let dir = lock_dir();
    let connector = loopback_connector();
    let mut link = mock_transport(dir.path(), &connector);

    for _ in 0..3 {
        link.open_link().unwrap();
        link.close_link();
    }
    assert_eq!(connector.opened().len(), 3);
    assert!(!lock_exists(dir.path()));
}
