//! # Serial Communication Module
//!
//! Handles the serial link to the motion controller.
//!
//! This module handles:
//! - Opening the controller's serial port (8N1, configurable baud)
//! - Newline framing of commands and responses
//! - Discarding stale input before each command

pub mod port_trait;

use crate::error::{PlotjogError, Result};
use tracing::info;

pub use port_trait::{CommandPort, DiscardInput, SerialLink};

/// Default baud rate for Marlin-style controllers
pub const DEFAULT_BAUD_RATE: u32 = 250_000;

/// Serial link to a G-code motion controller
pub type ControllerSerial = SerialLink<tokio_serial::SerialStream>;

/// Open the motion controller's serial port
///
/// # Arguments
///
/// * `path` - Device path (e.g., "/dev/ttyUSB0")
/// * `baud_rate` - Line speed
///
/// # Errors
///
/// Returns `Serial` if the port cannot be opened
///
/// # Examples
///
/// ```no_run
/// use plotjog::serial::{open, DEFAULT_BAUD_RATE};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let link = open("/dev/ttyUSB0", DEFAULT_BAUD_RATE)?;
///     println!("Connected to: {}", link.device_path());
///     Ok(())
/// }
/// ```
pub fn open(path: &str, baud_rate: u32) -> Result<ControllerSerial> {
    let port = open_port(path, baud_rate)?;
    info!("Opened motion controller at {} ({} baud)", path, baud_rate);
    Ok(SerialLink::new(port, path))
}

fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
    use tokio_serial::SerialPortBuilderExt;

    tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| PlotjogError::Serial(format!("Failed to open {}: {}", path, e)))
}
