mod config;
mod daemon;
mod hardware;
mod sink;

use ads129x_afe::{BusLink, SimulatedChip};
use anyhow::{Context, Result};
use log::{error, info};
use std::fs;
use tokio::signal::unix::{signal, SignalKind};

use crate::config::Config;
use crate::daemon::Daemon;

/// ID register of the part the simulator pretends to be, an ADS1298R
const SIMULATED_ID: u8 = 0xD2;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/ads129x-streamer/config.yaml".to_string());

    // Logging destination comes from the config, so it is read first
    let config = load_config(&config_path)?;
    init_logger(&config)?;

    info!("ADS129x streamer starting...");
    info!("Configuration loaded from: {}", config_path);

    if config.is_simulated() {
        info!("Using simulated ADC");
        run(Daemon::new(SimulatedChip::new(SIMULATED_ID).with_wall_clock(), config)?, &config_path).await?;
    } else {
        let link = hardware::open(&config.spi, &config.pins)?;
        run(Daemon::new(link, config)?, &config_path).await?;
    }

    info!("ADS129x streamer shutdown complete");
    Ok(())
}

async fn run<L>(mut daemon: Daemon<L>, config_path: &str) -> Result<()>
where
    L: BusLink,
    L::Error: Send + Sync + 'static,
{
    // Setup signal handling via tokio
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;
    let mut sighup = signal(SignalKind::hangup()).context("Failed to setup SIGHUP handler")?;

    info!("Daemon started successfully");

    loop {
        tokio::select! {
            result = daemon.poll() => {
                if let Err(e) = result {
                    error!("Daemon poll error: {:#}", e);
                    daemon.shutdown()?;
                    return Err(e);
                }
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully");
                break;
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading configuration");
                let reloaded = load_config(config_path).and_then(|new_config| daemon.reload_config(new_config));
                if let Err(e) = reloaded {
                    error!("Keeping current configuration: {:#}", e);
                    if !daemon.is_streaming() {
                        error!("ADC could not be restarted, shutting down");
                        daemon.shutdown()?;
                        return Err(e);
                    }
                }
            }
        }
    }

    daemon.shutdown()
}

fn load_config(path: &str) -> Result<Config> {
    let content = fs::read_to_string(path).context(format!("Failed to read config file: {}", path))?;
    serde_yaml::from_str(&content).context("Failed to parse configuration file")
}

fn init_logger(config: &Config) -> Result<()> {
    if config.logging.syslog {
        let level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|l| l.parse().ok())
            .unwrap_or(log::LevelFilter::Info);
        return syslog::init(syslog::Facility::LOG_DAEMON, level, Some("ads129x-streamer"))
            .map_err(|e| anyhow::anyhow!("Failed to connect to syslog: {}", e));
    }

    // Use `env_logger` for logging. Systemd/journald will capture stdout/stderr.
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();
    Ok(())
}
