//! # SBC HAL Diagnostic Binary
//!
//! Brings up the HAL on the running board and inspects or drives the
//! resources it finds.
//!
//! # Usage
//!
//! ```bash
//! # Bring-up report as JSON
//! sbc_hal report
//!
//! # Every pin with its function and header position
//! sbc_hal pins
//!
//! # Drive header position 7 high, then wait for a rising edge on GPIO10
//! sbc_hal write P1_7 high
//! sbc_hal wait GPIO10 rising --timeout-ms 5000
//!
//! # Verbose logging with a custom configuration
//! sbc_hal --config ./hal.toml -v buses
//! ```

use clap::{Parser, Subcommand};
use sbc_common::config::HalConfig;
use sbc_common::consts::DEFAULT_CONFIG_PATH;
use sbc_common::hal::driver::HalError;
use sbc_common::hal::types::{Direction, Edge, Level, Pull};
use sbc_hal::Hal;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level as LogLevel, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// SBC HAL - name-based access to board GPIO and buses
#[derive(Parser, Debug)]
#[command(name = "sbc_hal")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Hardware abstraction layer for single-board computers")]
#[command(long_about = None)]
struct Args {
    /// Path to the HAL configuration file (hal.toml). Defaults apply when
    /// the file does not exist.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the bring-up report as JSON
    Report,
    /// List pins with function and header position
    Pins,
    /// Print the physical headers
    Headers,
    /// List I2C buses, SPI ports and 1-Wire masters
    Buses,
    /// Read the level of a pin
    Read {
        /// Pin name or alias (PA12, GPIO12, P1_3)
        pin: String,
    },
    /// Make a pin an output and drive it
    Write {
        /// Pin name or alias
        pin: String,
        /// high or low
        level: Level,
    },
    /// Wait for an edge on an input pin
    Wait {
        /// Pin name or alias
        pin: String,
        /// rising, falling or both
        edge: Edge,
        /// Give up after this many milliseconds (waits forever if omitted)
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

fn main() {
    if let Err(e) = run() {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = HalConfig::load_or_default(&args.config);
    let configured = config
        .as_ref()
        .map(|c| c.shared.log_level.as_directive())
        .unwrap_or("info");
    setup_tracing(&args, configured);

    debug!("SBC HAL v{} starting", env!("CARGO_PKG_VERSION"));
    let config = config?;
    let mut hal = Hal::new(config)?;
    let report = hal.init()?;
    for outcome in &report.failed {
        warn!("Driver '{}' failed: {}", outcome.driver, outcome.reason);
    }
    for outcome in &report.skipped {
        debug!("Driver '{}' skipped: {}", outcome.driver, outcome.reason);
    }

    let result = execute(&hal, &args.command);
    hal.shutdown();
    result
}

fn execute(hal: &Hal, command: &Command) -> Result<(), Box<dyn std::error::Error>> {
    let registries = hal.registries();
    match command {
        Command::Report => {
            let report = hal.report().cloned().unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Pins => {
            for (name, pin) in registries.pins.all() {
                let number = pin
                    .number()
                    .map_or_else(|| "-".to_string(), |n| n.to_string());
                let position = registries
                    .header_position(&name)
                    .map_or_else(String::new, |p| format!("{}_{}", p.header, p.index));
                let state = if !pin.is_gpio() {
                    "power".to_string()
                } else if !pin.is_available() {
                    "unavailable".to_string()
                } else {
                    pin.function().to_string()
                };
                println!("{name:<8} {number:>4}  {state:<16} {position}");
            }
        }
        Command::Headers => {
            for header in registries.headers.all() {
                println!("{}:", header.name);
                let mut index = 1;
                for row in &header.rows {
                    let cells: Vec<String> = row
                        .iter()
                        .map(|pin| {
                            let cell = format!("{index:>2} {pin:<8}");
                            index += 1;
                            cell
                        })
                        .collect();
                    println!("  {}", cells.join(" "));
                }
            }
        }
        Command::Buses => {
            for (name, bus) in registries.i2c.all() {
                let pins = bus
                    .pins()
                    .map(|p| format!(" scl={} sda={}", p.scl.name(), p.sda.name()))
                    .unwrap_or_default();
                println!("{name:<10} {}{pins}", bus.path().display());
            }
            for (name, port) in registries.spi.all() {
                let pins = port
                    .pins()
                    .map(|p| format!(" clk={} cs={}", p.clk.name(), p.cs.name()))
                    .unwrap_or_default();
                println!("{name:<10} {}{pins}", port.path().display());
            }
            for (name, bus) in registries.onewire.all() {
                let devices = bus.devices().unwrap_or_default();
                println!("{name:<10} {} [{}]", bus.path().display(), devices.join(", "));
            }
        }
        Command::Read { pin } => {
            let level = hal.pin(pin)?.read()?;
            println!("{level}");
        }
        Command::Write { pin, level } => {
            let pin = hal.pin(pin)?;
            pin.set_direction(Direction::Out(*level))?;
            info!("{} -> {}", pin.name(), level);
        }
        Command::Wait {
            pin,
            edge,
            timeout_ms,
        } => {
            if *edge == Edge::None {
                return Err(HalError::Unsupported("cannot wait for edge 'none'".into()).into());
            }
            let pin = hal.pin(pin)?;
            if pin.is_mapped() {
                pin.set_direction(Direction::In(Pull::Float))?;
            }
            pin.enable_edge_detection(*edge)?;
            let fired = pin.wait_for_edge(timeout_ms.map(Duration::from_millis))?;
            pin.halt()?;
            println!("{}", if fired { "edge" } else { "timeout" });
        }
    }
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, configured: &str) {
    let level = if args.verbose {
        LogLevel::DEBUG
    } else {
        configured.parse().unwrap_or(LogLevel::INFO)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
