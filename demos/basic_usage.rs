//! Basic Usage Example
//!
//! This example demonstrates the core functionality of the Si8900 protocol library:
//! - Listing and selecting serial ports
//! - Running the auto-baud handshake
//! - Reading each input channel once and oversampled
//! - Printing timestamped measurements as JSON
//!
//! Usage:
//!   cargo run --example basic_usage                              # Interactive mode
//!   cargo run --example basic_usage -- COM3                      # Specify port
//!   cargo run --example basic_usage -- /dev/ttyUSB0 link.json    # Port and config file
//!
//! Set RUST_LOG environment variable to control logging:
//!   RUST_LOG=debug cargo run --example basic_usage
//!   RUST_LOG=trace cargo run --example basic_usage   # every byte on the wire

use inquire::Select;
use log::{info, warn};
use si8900_protocol::{build_command, InputChannel, LinkConfig, Mode, Pga, Result, Si8900, Vref};

/// Interactive serial port selection using inquire
fn select_port() -> Result<String> {
    let ports = Si8900::list_ports()?;

    if ports.is_empty() {
        eprintln!("No serial ports found!");
        std::process::exit(1);
    }

    let port_names: Vec<String> = ports
        .iter()
        .map(|p| format!("{} - {:?}", p.port_name, p.port_type))
        .collect();

    let selection = Select::new("Select a serial port:", port_names)
        .prompt()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("Selection cancelled: {}", e)))?;

    // Extract just the port name (before " - ")
    let port_name = selection.split(" - ").next().unwrap_or_default().to_string();
    Ok(port_name)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let port_name = match args.next() {
        Some(name) => name,
        None => select_port()?,
    };
    let config = match args.next() {
        Some(path) => LinkConfig::load(path)?,
        None => LinkConfig::default(),
    };

    info!("Opening Si8900 on {} at {} baud...", port_name, config.baud_rate);
    let mut adc = Si8900::open(&port_name, config)?;

    info!("=== Auto-baud Handshake ===");
    if let Err(e) = adc.synchronize() {
        warn!("✗ Handshake failed: {}", e);
        return Ok(());
    }
    info!("✓ Link synchronized");

    info!("=== Single Readings ===");
    for inch in InputChannel::ALL {
        let cmd = build_command(Pga::Half, Mode::Single, Vref::Internal, inch);
        let reading = adc.read(cmd)?;
        if reading.is_failed() {
            warn!("channel {}: echo mismatch", inch.index());
        } else {
            info!("channel {}: {}", reading.channel, reading.value);
        }
    }

    info!("=== Oversampled Measurements ===");
    for inch in InputChannel::ALL {
        let cmd = build_command(Pga::Half, Mode::Single, Vref::Internal, inch);
        let measurement = adc.measure(cmd, 16)?;
        println!("{}", serde_json::to_string(&measurement)?);
    }

    info!("=== Basic Usage Complete ===");

    Ok(())
}
