// src/main.rs
//! GPS Link - find a serial GPS receiver and follow its position

use clap::Parser;
use gps_link::{
    config::GpsConfig,
    display::{self, DisplayMode},
    link::transport,
    GpsMonitor,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "gps-link", version, about = "Auto-detect a serial GPS receiver and track its fix")]
struct Cli {
    /// Device to probe (repeatable, replaces the configured list)
    #[arg(short, long = "device")]
    devices: Vec<String>,

    /// Baud rate to try (repeatable, replaces the configured list)
    #[arg(short, long = "baud")]
    bauds: Vec<u32>,

    /// Rate to switch the receiver to once found
    #[arg(long, conflicts_with = "no_baud_change")]
    preferred_baud: Option<u32>,

    /// Leave the receiver at the rate it was found on
    #[arg(long)]
    no_baud_change: bool,

    /// How long to wait for a valid sentence on each candidate
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Write the effective configuration to the config file
    #[arg(long)]
    save_config: bool,

    /// Log snapshots instead of drawing the terminal display
    #[arg(long)]
    plain: bool,
}

impl Cli {
    fn apply(&self, config: &mut GpsConfig) {
        if !self.devices.is_empty() {
            config.devices = self.devices.clone();
        }
        if !self.bauds.is_empty() {
            config.baud_rates = self.bauds.clone();
        }
        if let Some(baud) = self.preferred_baud {
            config.preferred_baud = Some(baud);
        }
        if self.no_baud_change {
            config.preferred_baud = None;
        }
        if let Some(ms) = self.timeout_ms {
            config.detect_timeout_ms = ms;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they don't fight with the terminal display
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,gps_link=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if cli.list_ports {
        let ports = transport::available_ports()?;
        if ports.is_empty() {
            println!("No serial ports found.");
        } else {
            println!("Available serial ports:");
            for port in ports {
                println!("  {} - {:?}", port.port_name, port.port_type);
            }
        }
        return Ok(());
    }

    let mut config = GpsConfig::load().unwrap_or_else(|e| {
        warn!("Using default configuration: {}", e);
        GpsConfig::default()
    });
    cli.apply(&mut config);
    config.validate()?;

    if cli.save_config {
        config.save()?;
        info!("Configuration saved to {}", GpsConfig::get_config_path()?.display());
    }

    let monitor = GpsMonitor::new(config);
    let Some((link, mut reader)) = monitor.start().await? else {
        error!("No GPS receiver found");
        return Ok(());
    };
    info!("Reading GPS on {}", link);

    let mode = if cli.plain {
        DisplayMode::Log
    } else {
        DisplayMode::Terminal
    };
    let display = tokio::spawn(display::run_display(mode, monitor.state(), monitor.subscribe()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        result = &mut reader => {
            match result {
                Ok(Ok(())) => info!("GPS reader stopped"),
                Ok(Err(e)) => error!("GPS reader failed: {}", e),
                Err(e) => error!("GPS reader task panicked: {}", e),
            }
        }
    }

    monitor.stop();
    display.await??;
    if !reader.is_finished() {
        let _ = reader.await;
    }

    info!("Shutdown complete");
    Ok(())
}
