//! # Error Types
//!
//! Custom error types for Plotjog using `thiserror`.

use thiserror::Error;

/// Main error type for Plotjog
#[derive(Debug, Error)]
pub enum PlotjogError {
    /// Serial port could not be opened or configured
    #[error("Serial error: {0}")]
    Serial(String),

    /// A command round trip with the device failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// No usable joystick device was found
    #[error("No joystick found: {0}")]
    JoystickNotFound(String),

    /// Reading from the joystick failed
    #[error("Joystick error: {0}")]
    Joystick(String),

    /// The joystick event stream ended
    #[error("Joystick input closed")]
    InputClosed,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// A pipeline task panicked or was cancelled
    #[error("Task failed: {0}")]
    Task(String),

    /// Move journal errors
    #[error("Journal error: {0}")]
    Journal(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Plotjog
pub type Result<T> = std::result::Result<T, PlotjogError>;
