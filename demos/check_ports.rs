//! Check which servo adapters are present and whether they are in use.
//!
//! Lists every USB-serial and ACM device node, its lock state, and how
//! common servo bus speeds would be programmed on this platform.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example check_ports
//! ```

use servo_link::baud::BaudRateResolver;
use servo_link::config::{Config, ConfigLoader};
use servo_link::{DeviceLock, PortScanner};

const BUS_SPEEDS: [u32; 6] = [57_600, 115_200, 250_000, 500_000, 1_000_000, 3_000_000];

fn main() {
    let config = match ConfigLoader::load() {
        Ok(loader) => loader.into_config(),
        Err(e) => {
            eprintln!("Warning: {}; using built-in defaults", e);
            Config::default()
        }
    };
    let scanner = PortScanner::with_root(&config.scan.root);
    let locks = DeviceLock::new(config.lock.dir());

    println!("Servo Adapter Detection Utility");
    println!("{:=<70}", "");
    println!();

    let ports = scanner.scan();
    if ports.is_empty() {
        println!("No USB/TTL adapters found under {}", scanner.root().display());
        println!();
        println!("This could mean:");
        println!("  - No adapter is plugged in");
        println!("  - The ftdi_sio or cdc_acm driver is not loaded");
        println!("  - The adapter is only exposed as a fixed ttyS port");
    } else {
        println!("Found {} adapter(s):", ports.len());
        println!();
        for (idx, port) in ports.iter().enumerate() {
            let state = match (locks.is_locked(port.path()), locks.holder(port.path())) {
                (true, Some(pid)) => format!("locked by pid {}", pid),
                (true, None) => "locked".to_string(),
                (false, Some(pid)) => format!("free (stale lock from pid {})", pid),
                (false, None) => "free".to_string(),
            };
            println!("{}. {}", idx + 1, port.path());
            println!("   Class: {:?}", port.class());
            println!("   Lock:  {} ({})", state, locks.lock_path(port.path()).display());
        }
    }

    println!();
    println!("Speed mapping:");
    let resolver = BaudRateResolver::default();
    for speed in BUS_SPEEDS {
        println!("   {:>9} bps -> {}", speed, resolver.resolve(speed));
    }
}
