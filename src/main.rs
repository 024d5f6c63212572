// src/main.rs
//! GPS Compass - serial NMEA speed, position and heading monitor

use anyhow::{bail, Context};
use clap::Parser;
use gps_compass::{
    config::CompassConfig,
    display::{self, json::JsonLinesDisplay, terminal::TerminalDisplay},
    gps::serial,
    logging, GpsError, NavMonitor,
};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "gps-compass", version, about = "Serial NMEA 0183 GPS compass")]
struct Cli {
    /// Serial port the receiver is attached to, e.g. /dev/ttyUSB0 or COM3
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Presentation timezone, e.g. Europe/Berlin, America/New_York or +05:30.
    /// Saved for next time.
    #[arg(long, visible_alias = "utc-offset", allow_hyphen_values = true)]
    time_zone: Option<String>,

    /// Print one JSON object per update instead of the terminal screen
    #[arg(long)]
    json: bool,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Write diagnostics to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Silence after which the fix is reported as lost
    #[arg(long)]
    stale_after_ms: Option<u64>,

    /// Publication interval
    #[arg(long)]
    interval_ms: Option<u64>,
}

fn print_ports() -> anyhow::Result<()> {
    let ports = serial::list_serial_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    } else {
        println!("Available serial ports:");
        for port in ports {
            println!("  {}", port);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _logging =
        logging::init_logging(cli.log_file.as_deref()).context("Failed to initialise logging")?;

    if cli.list_ports {
        return print_ports();
    }

    let mut config = CompassConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Falling back to default configuration");
        CompassConfig::default()
    });

    if let Some(port) = cli.port {
        let baudrate = cli.baud.unwrap_or(config.baudrate);
        config.update_serial(port, baudrate);
    } else if let Some(baudrate) = cli.baud {
        config.baudrate = baudrate;
    }
    if let Some(ms) = cli.stale_after_ms {
        config.stale_after_ms = ms;
    }
    if let Some(ms) = cli.interval_ms {
        config.publish_interval_ms = ms;
    }
    if let Some(text) = &cli.time_zone {
        config.update_time_zone(text)?;
        if let Err(e) = config.save() {
            warn!(error = %e, "Could not save configuration");
        }
    }

    let Some(port) = config.serial_port.clone() else {
        print_ports()?;
        bail!("No serial port given");
    };
    let zone = config.time_zone()?;

    let monitor = NavMonitor::connect_serial(&port, config.baudrate, config.to_monitor_config())?;
    let cancel = monitor.cancellation_token();

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted");
            interrupt.cancel();
        }
    });

    let shown = if cli.json {
        display::drive(monitor.subscribe(), &mut JsonLinesDisplay::new(), cancel).await
    } else {
        display::drive(monitor.subscribe(), &mut TerminalDisplay::new(zone), cancel).await
    };

    let stopped = monitor.shutdown().await;
    shown?;

    match stopped {
        Ok(stats) => {
            info!(applied = stats.applied, rejected = stats.rejected(), "Stopped");
            Ok(())
        }
        Err(GpsError::Disconnected(reason)) => bail!("GPS receiver disconnected: {}", reason),
        Err(e) => Err(e.into()),
    }
}
