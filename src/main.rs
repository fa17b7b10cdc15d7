use clap::{Args, Parser, Subcommand};
use serde_json::json;
use servo_link::config::{Config, ConfigLoader, LogFormat, LoggingConfig};
use servo_link::{AdapterKind, AppError, BaudRateResolver, DeviceLock, ServoFamily};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

#[derive(Parser, Debug)]
#[command(
    name = "servo-link",
    version,
    about = "Serial link tooling for smart servo buses.",
    long_about = "Finds USB/TTL adapters, checks how a baud rate will be programmed, inspects device locks and exchanges raw packets with a servo bus."
)]
struct Cli {
    /// Configuration file (defaults to the standard search path)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List candidate serial adapters
    Scan {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the effective rate and how it maps onto the OS
    Resolve {
        /// Requested rate, or a baudnum when a servo family is given
        baud: u32,
        #[arg(long, value_enum, default_value_t = ServoFamily::Unknown)]
        servo: ServoFamily,
        #[arg(long, value_enum, default_value_t = AdapterKind::Unknown)]
        adapter: AdapterKind,
        #[arg(long)]
        json: bool,
    },
    /// Inspect or clear device lock files
    Lock {
        #[command(subcommand)]
        action: LockAction,
    },
    /// Open the link, optionally send a packet and read a reply
    Probe(ProbeArgs),
}

#[derive(Subcommand, Debug)]
enum LockAction {
    /// Report whether a live process holds the device
    Status { device: String },
    /// Remove the lock file whatever its owner
    Unlock { device: String },
}

#[derive(Args, Debug)]
struct ProbeArgs {
    /// Device path, or "auto"
    #[arg(short, long)]
    device: Option<String>,
    /// Requested rate or baudnum
    #[arg(short, long)]
    baud: Option<u32>,
    #[arg(long, value_enum)]
    servo: Option<ServoFamily>,
    /// Bytes to transmit, as hex ("FF FF 01 02 01 FB")
    #[arg(long)]
    send: Option<String>,
    /// Number of reply bytes to wait for
    #[arg(long, default_value_t = 0)]
    read: usize,
    /// Explicit reply deadline; a packet-sized deadline is used otherwise
    #[arg(long)]
    timeout_ms: Option<u64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => ConfigLoader::load_from(path),
        None => ConfigLoader::load(),
    };
    let loader = match loaded {
        Ok(loader) => loader,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(AppError::Config(e).exit_code());
        }
    };
    init_tracing(&loader.config().logging, cli.verbose);
    if let Some(path) = &loader.config_path {
        debug!("Using configuration {}", path.display());
    }

    match run(cli.command, loader.config()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

// Logs go to stderr so `--json` output on stdout stays machine readable.
// RUST_LOG wins over both the config file and -v.
fn init_tracing(logging: &LoggingConfig, verbose: u8) {
    let level = match verbose {
        0 => logging.level.parse().unwrap_or(LevelFilter::INFO),
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

fn run(command: Command, config: &Config) -> Result<(), AppError> {
    match command {
        Command::Scan { json } => scan(config, json),
        Command::Resolve {
            baud,
            servo,
            adapter,
            json,
        } => resolve(baud, servo, adapter, json),
        Command::Lock { action } => lock(config, action),
        Command::Probe(args) => probe(config, args),
    }
}

fn scan(config: &Config, json: bool) -> Result<(), AppError> {
    let ports = config.scan.scanner().scan();
    if json {
        println!("{}", serde_json::to_string_pretty(&ports)?);
        return Ok(());
    }
    if ports.is_empty() {
        println!("No serial adapters found under {}", config.scan.root.display());
    }
    for port in &ports {
        println!("{:<24} {:?}", port.path(), port.class());
    }
    Ok(())
}

fn resolve(
    baud: u32,
    servo: ServoFamily,
    adapter: AdapterKind,
    json: bool,
) -> Result<(), AppError> {
    let rate = servo_link::baud::select_baud_rate(baud, servo, adapter);
    let flag = BaudRateResolver::default().resolve(rate);
    if json {
        let value = json!({
            "requested": baud,
            "servo": servo,
            "adapter": adapter,
            "rate": rate,
            "custom": flag.is_custom(),
            "flag": flag.to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{} -> {} bps ({})", baud, rate, flag);
    }
    Ok(())
}

fn lock(config: &Config, action: LockAction) -> Result<(), AppError> {
    let locks = DeviceLock::new(config.lock.dir());
    match action {
        LockAction::Status { device } => {
            let path = locks.lock_path(&device);
            match (locks.is_locked(&device), locks.holder(&device)) {
                (true, Some(pid)) => println!("{} locked by pid {} ({})", device, pid, path.display()),
                (true, None) => println!("{} locked ({})", device, path.display()),
                (false, Some(pid)) => println!("{} free, stale lock from pid {}", device, pid),
                (false, None) => println!("{} free", device),
            }
        }
        LockAction::Unlock { device } => {
            if locks.force_unlock(&device) {
                info!("Removed lock for {}", device);
                println!("{} unlocked", device);
            } else {
                return Err(AppError::InvalidArgument(format!(
                    "could not remove {}",
                    locks.lock_path(&device).display()
                )));
            }
        }
    }
    Ok(())
}

fn probe(config: &Config, args: ProbeArgs) -> Result<(), AppError> {
    let payload = args.send.as_deref().map(parse_hex).transpose()?;

    let mut config = config.clone();
    if let Some(device) = args.device {
        config.link.device = device;
    }
    if let Some(baud) = args.baud {
        config.link.baud = baud;
    }
    if let Some(servo) = args.servo {
        config.link.servo = servo;
    }

    let mut link = config.transport_builder().build();
    link.open_link()?;
    println!(
        "Opened {} at {} bps ({})",
        link.device_path().unwrap_or("?"),
        link.baud_rate(),
        link.baud_flag()
    );

    if let Some(payload) = payload {
        link.flush();
        let sent = link.tx(&payload)?;
        println!("Sent {}/{} bytes: {}", sent, payload.len(), to_hex(&payload[..sent]));
    }

    if args.read > 0 {
        match args.timeout_ms {
            Some(ms) => link.set_timeout(Duration::from_millis(ms)),
            None => link.set_timeout_packet(args.read),
        }
        let mut reply = vec![0u8; args.read];
        let received = link.rx(&mut reply)?;
        println!(
            "Received {}/{} bytes in {:?}: {}",
            received,
            args.read,
            link.check_timeout(),
            to_hex(&reply[..received])
        );
    }

    link.close_link();
    Ok(())
}

/// Parse "FF FF 01", "0xFF,0x01" or "FFFF01" into bytes.
fn parse_hex(input: &str) -> Result<Vec<u8>, AppError> {
    let digits: String = input
        .split(|c: char| c.is_whitespace() || c == ',' || c == ':')
        .map(|token| token.trim_start_matches("0x").trim_start_matches("0X"))
        .collect();

    if digits.len() % 2 != 0 {
        return Err(AppError::InvalidArgument(format!(
            "odd number of hex digits in '{}'",
            input
        )));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| AppError::InvalidArgument(format!("invalid hex in '{}'", input)))
        })
        .collect()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
