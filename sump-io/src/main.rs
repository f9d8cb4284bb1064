//! SumpIO - Sump pump monitor daemon
//!
//! ## Protocol
//!
//! - **UDP port 32000**: plaintext commands and replies (`TAG=VALUE\r\n`)
//! - **Broadcast `PAIR=0`**: announced every pairing period until a client
//!   sends `SETPAIR=1`; telemetry is then unicast to that client every push
//!   period

use std::env;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use sump_io::config::Config;
use sump_io::devices::{create_beeper, create_sensors};
use sump_io::error::{Error, Result};
use sump_io::sump::{self, Sampler};
use sump_io::transport::Transport;

const DEFAULT_CONFIG_PATH: &str = "/etc/sumpio.toml";

/// Parse config path from command line arguments.
///
/// Supports:
/// - `sump-io <path>` (positional)
/// - `sump-io --config <path>` (flag-based)
/// - `sump-io -c <path>` (short flag)
///
/// Returns `None` when no path is given.
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    None
}

/// Explicit paths must exist; a missing default file means built-in defaults
fn load_config() -> Result<(Config, String)> {
    match parse_config_path() {
        Some(path) => Ok((Config::load(&path)?, path)),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Ok((
            Config::load(DEFAULT_CONFIG_PATH)?,
            DEFAULT_CONFIG_PATH.to_string(),
        )),
        None => Ok((Config::default(), "built-in defaults".to_string())),
    }
}

fn main() -> Result<()> {
    let (config, source) = load_config()?;

    // RUST_LOG overrides the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("SumpIO v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Using config: {}", source);
    log::info!(
        "Device: {} (sampling every {}s)",
        config.device.device_type,
        config.device.sensor_period_secs
    );

    let sensors = create_sensors(&config)?;
    let beeper = create_beeper(&config)?;
    let registers = sump::create_registers(&config.alarms, &config.device).into_shared();

    let sampler = Sampler::start(sensors, beeper, Arc::clone(&registers))?;
    let transport = Transport::start(
        &config,
        sump::device_commands(sampler.scan_trigger()),
        sump::push_list(),
        registers,
    )?;

    // Set up shutdown signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    log::info!("SumpIO running on {}. Press Ctrl-C to stop.", transport.local_addr());

    while running.load(Ordering::Relaxed) {
        if transport.is_shutdown_requested() {
            log::info!("Remote shutdown requested");
            break;
        }
        if transport.any_finished() {
            log::error!("A transport thread exited unexpectedly");
            break;
        }
        thread::sleep(Duration::from_millis(200));
    }

    log::info!("Shutting down...");
    let transport_result = transport.stop();
    let sampler_result = sampler.stop();
    transport_result?;
    sampler_result?;

    log::info!("SumpIO stopped");
    Ok(())
}
