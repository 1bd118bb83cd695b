//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::motion::sampler::SamplerSettings;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub serial: SerialConfig,
    pub input: InputConfig,
    pub motion: MotionConfig,
    pub timing: TimingConfig,
    pub logging: LoggingConfig,
    pub journal: JournalConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Joystick backend selection
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputBackend {
    /// Linux joystick API (`/dev/input/js*`)
    #[default]
    Joydev,
    /// Linux event interface (`/dev/input/event*`)
    Evdev,
}

/// Joystick input configuration
#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    #[serde(default)]
    pub backend: InputBackend,

    /// Empty means auto-detect
    #[serde(default)]
    pub device_path: String,
}

/// Motion scaling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MotionConfig {
    /// Feed rate in mm/min sent with every move
    #[serde(default = "default_feed_rate")]
    pub feed_rate: u32,

    /// Millimeters of travel per command cycle at full deflection
    #[serde(default = "default_max_reach")]
    pub max_reach: f32,

    /// Stick vectors with a norm at or below this are treated as jitter
    #[serde(default = "default_min_norm")]
    pub min_norm: f32,
}

/// Sampling cadence configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    #[serde(default = "default_poll_period_ms")]
    pub poll_period_ms: u64,

    /// Command cadence as a multiple of the poll period
    #[serde(default = "default_command_every_polls")]
    pub command_every_polls: u32,

    /// Capacity of the queue between the joystick reader and the sampler
    #[serde(default = "default_event_queue")]
    pub event_queue: usize,
}

/// Log output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files. Empty disables file logging.
    #[serde(default)]
    pub file_dir: String,
}

/// Move journal configuration
#[derive(Debug, Deserialize, Clone)]
pub struct JournalConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_journal_path")]
    pub path: String,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { crate::serial::DEFAULT_BAUD_RATE }

fn default_feed_rate() -> u32 { 400 }
fn default_max_reach() -> f32 { 0.2 }
fn default_min_norm() -> f32 { 0.2 }

fn default_poll_period_ms() -> u64 { 1 }
fn default_command_every_polls() -> u32 { 20 }
fn default_event_queue() -> usize { 256 }

fn default_journal_path() -> String { "./logs/moves.jsonl".to_string() }

/// Baud rates accepted for the motion controller link
const VALID_BAUD_RATES: &[u32] = &[
    9600, 19200, 38400, 57600, 115200, 230400, 250000, 500000, 1000000,
];

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig {
                port: default_serial_port(),
                baud_rate: default_baud_rate(),
            },
            input: InputConfig {
                backend: InputBackend::default(),
                device_path: String::new(),
            },
            motion: MotionConfig {
                feed_rate: default_feed_rate(),
                max_reach: default_max_reach(),
                min_norm: default_min_norm(),
            },
            timing: TimingConfig {
                poll_period_ms: default_poll_period_ms(),
                command_every_polls: default_command_every_polls(),
                event_queue: default_event_queue(),
            },
            logging: LoggingConfig {
                file_dir: String::new(),
            },
            journal: JournalConfig {
                enabled: false,
                path: default_journal_path(),
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use plotjog::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Sampler parameters derived from the motion and timing sections
    pub fn sampler_settings(&self) -> SamplerSettings {
        SamplerSettings {
            min_norm: self.motion.min_norm,
            max_reach: self.motion.max_reach,
            command_every_polls: self.timing.command_every_polls,
        }
    }

    /// Poll tick period
    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.timing.poll_period_ms)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(crate::error::PlotjogError::Config(
                toml::de::Error::custom("serial port cannot be empty")
            ));
        }

        if !VALID_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(crate::error::PlotjogError::Config(
                toml::de::Error::custom(format!(
                    "baud_rate must be one of: {:?}",
                    VALID_BAUD_RATES
                ))
            ));
        }

        if self.motion.feed_rate == 0 || self.motion.feed_rate > 100_000 {
            return Err(crate::error::PlotjogError::Config(
                toml::de::Error::custom("feed_rate must be between 1 and 100000")
            ));
        }

        // NaN fails both comparisons, so test for the valid range
        if !(self.motion.max_reach > 0.0 && self.motion.max_reach <= 10.0) {
            return Err(crate::error::PlotjogError::Config(
                toml::de::Error::custom("max_reach must be greater than 0.0 and at most 10.0")
            ));
        }

        // A floor at or above sqrt(2) can never be cleared by a two-axis stick
        if !(self.motion.min_norm >= 0.0 && self.motion.min_norm < std::f32::consts::SQRT_2) {
            return Err(crate::error::PlotjogError::Config(
                toml::de::Error::custom("min_norm must be between 0.0 and sqrt(2)")
            ));
        }

        if self.timing.poll_period_ms == 0 || self.timing.poll_period_ms > 1000 {
            return Err(crate::error::PlotjogError::Config(
                toml::de::Error::custom("poll_period_ms must be between 1 and 1000")
            ));
        }

        if self.timing.command_every_polls == 0 || self.timing.command_every_polls > 1000 {
            return Err(crate::error::PlotjogError::Config(
                toml::de::Error::custom("command_every_polls must be between 1 and 1000")
            ));
        }

        if self.timing.event_queue == 0 || self.timing.event_queue > 65536 {
            return Err(crate::error::PlotjogError::Config(
                toml::de::Error::custom("event_queue must be between 1 and 65536")
            ));
        }

        if self.journal.enabled && self.journal.path.is_empty() {
            return Err(crate::error::PlotjogError::Config(
                toml::de::Error::custom("journal path cannot be empty when enabled")
            ));
        }

        Ok(())
    }
}
