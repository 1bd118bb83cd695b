//! # Plotjog
//!
//! Jog a G-code motion controller with a joystick.
//!
//! This application reads the joystick's X/Y stick axes and streams relative
//! `G1` moves to a plotter or printer over a serial link.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::atomic::Ordering;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use plotjog::config::{Config, LoggingConfig};
use plotjog::joystick;
use plotjog::pipeline::Bridge;
use plotjog::serial;
use plotjog::telemetry::MoveJournal;

/// Configuration file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for Plotjog
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, `config/default.toml`, or defaults)
///    - Set up logging with tracing subscriber
///    - Open the joystick and the controller's serial port
///
/// 2. **Main Loop**
///    - Reader thread forwards stick axis changes
///    - Producer samples the stick every poll tick and posts targets
///    - Actuation task sends `G91` + `G1` for the freshest target
///
/// 3. **Shutdown**
///    - On Ctrl+C, joystick loss, or a serial failure
///    - Log total move count
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
///
/// Expected output:
/// ```text
/// INFO plotjog: Plotjog v0.1.0 starting...
/// INFO plotjog::joystick::joydev: Opened joystick at /dev/input/js0
/// INFO plotjog::serial: Opened motion controller at /dev/ttyUSB0 (250000 baud)
/// INFO plotjog::actuator: Actuation loop started (feed rate 400 mm/min)
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    let _log_guard = init_logging(&config.logging);

    info!("Plotjog v{} starting...", env!("CARGO_PKG_VERSION"));

    let source = joystick::open(&config.input).context("failed to open joystick")?;
    info!("Using input device: {}", source.device_path());

    let port = serial::open(&config.serial.port, config.serial.baud_rate)
        .context("failed to open motion controller")?;

    let mut bridge = Bridge::new(&config, source, port);
    if config.journal.enabled {
        let journal = MoveJournal::open(&config.journal.path)?;
        info!("Journaling moves to {}", journal.path().display());
        bridge = bridge.with_journal(journal);
    }
    let executed = bridge.executed_counter();

    info!("Press Ctrl+C to exit");

    tokio::select! {
        result = bridge.run() => {
            info!("Total moves executed: {}", executed.load(Ordering::Relaxed));
            result?;
        }

        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            info!("Total moves executed: {}", executed.load(Ordering::Relaxed));
        }
    }

    Ok(())
}

/// Loads the configuration named on the command line, falling back to
/// `config/default.toml` and then to built-in defaults
fn load_config() -> Result<Config> {
    match std::env::args().nth(1) {
        Some(path) => {
            Config::load(&path).with_context(|| format!("failed to load config {}", path))
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("failed to load config {}", DEFAULT_CONFIG_PATH)),
        None => Ok(Config::default()),
    }
}

/// Console logging, plus a daily rolling file when `file_dir` is set
///
/// The returned guard flushes the file writer on drop.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = if config.file_dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&config.file_dir, "plotjog.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (
            Some(fmt::layer().with_writer(writer).with_ansi(false)),
            Some(guard),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}
