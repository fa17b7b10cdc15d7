//! Tests against a real adapter named by `TEST_PORT`.

use crate::common::lock_dir;
use crate::require_port;
use servo_link::{OpenError, PortScanner};
use std::time::{Duration, Instant};

#[test]
#[ignore]
fn scan_lists_configured_port() {
    let config = require_port!();
    if config.port_name.eq_ignore_ascii_case("auto") {
        assert!(PortScanner::new().autoselect().is_some());
        return;
    }
    let ports = PortScanner::new().scan();
    assert!(
        ports.iter().any(|p| p.path() == config.port_name),
        "{} not in {:?}",
        config.port_name,
        ports
    );
}

#[test]
#[ignore]
fn open_close_cycle() {
    let config = require_port!();
    let dir = lock_dir();
    let mut link = config.transport(dir.path());

    for _ in 0..3 {
        link.open_link().expect("open");
        assert!(link.is_open());
        link.close_link();
    }
}

#[test]
#[ignore]
fn second_transport_is_locked_out() {
    let config = require_port!();
    let dir = lock_dir();
    let mut first = config.transport(dir.path());
    let mut second = config.transport(dir.path());

    first.open_link().expect("open");
    assert!(matches!(second.open_link(), Err(OpenError::Locked(_))));
    first.close_link();
    second.open_link().expect("open after release");
}

#[test]
#[ignore]
fn idle_rx_honours_timeout() {
    let config = require_port!();
    let dir = lock_dir();
    let mut link = config.transport(dir.path());
    link.open_link().expect("open");
    link.flush();

    let timeout = Duration::from_millis(100);
    link.set_timeout(timeout);
    let started = Instant::now();
    let mut buffer = [0u8; 16];
    let received = link.rx(&mut buffer).expect("rx");

    if received < buffer.len() {
        assert!(started.elapsed() >= timeout);
    }
}

#[test]
#[ignore]
fn loopback_echo() {
    let config = require_port!();
    if !config.loopback_enabled {
        eprintln!("TEST_LOOPBACK not set, skipping");
        return;
    }
    let dir = lock_dir();
    let mut link = config.transport(dir.path());
    link.open_link().expect("open");
    link.flush();

    let ping = [0xFF, 0xFF, 0x01, 0x02, 0x01, 0xFB];
    assert_eq!(link.tx(&ping).expect("tx"), ping.len());
    link.set_timeout_packet(ping.len());
    let mut echo = [0u8; 6];
    assert_eq!(link.rx(&mut echo).expect("rx"), ping.len());
    assert_eq!(echo, ping);
}
