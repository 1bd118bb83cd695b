//! # Joydev Joystick Module
//!
//! Reads the Linux joystick API (`/dev/input/js*`).
//!
//! ## Event Format
//!
//! Each read returns one 8-byte `js_event`, little endian:
//!
//! | Offset | Type | Field |
//! |--------|------|-------|
//! | 0 | u32 | timestamp (ms) |
//! | 4 | i16 | value |
//! | 6 | u8 | type |
//! | 7 | u8 | axis/button number |
//!
//! Type bits: `0x01` button, `0x02` axis, `0x80` initial state. The driver
//! emits one initial-state event per axis and button right after open.
//! Axis values span -32767..=32767.

use bytes::Buf;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, info};

use super::{AxisEventSource, EventKind, JoystickEvent, Reading};
use crate::error::{PlotjogError, Result};

/// Size of one `js_event` record.
pub const JS_EVENT_SIZE: usize = 8;

/// Button state change.
pub const JS_EVENT_BUTTON: u8 = 0x01;
/// Axis position change.
pub const JS_EVENT_AXIS: u8 = 0x02;
/// Synthetic initial-state flag.
pub const JS_EVENT_INIT: u8 = 0x80;

/// Full-scale axis reading.
pub const JS_AXIS_MAX: f32 = 32767.0;

const INPUT_DIR: &str = "/dev/input";

/// Decodes one raw `js_event` record.
///
/// Returns `None` for records that are neither axis nor button events.
#[must_use]
pub fn decode_event(raw: &[u8; JS_EVENT_SIZE]) -> Option<JoystickEvent> {
    let mut buf = &raw[..];
    let time_ms = buf.get_u32_le();
    let value = buf.get_i16_le();
    let event_type = buf.get_u8();
    let number = buf.get_u8();

    let initial = event_type & JS_EVENT_INIT != 0;
    let (kind, value) = if event_type & JS_EVENT_AXIS != 0 {
        (EventKind::Axis, (f32::from(value) / JS_AXIS_MAX).clamp(-1.0, 1.0))
    } else if event_type & JS_EVENT_BUTTON != 0 {
        (EventKind::Button, if value != 0 { 1.0 } else { 0.0 })
    } else {
        return None;
    };

    Some(JoystickEvent {
        time_ms,
        kind,
        number,
        value,
        initial,
    })
}

/// Joystick opened through the joydev interface.
pub struct JoydevJoystick<R = File> {
    reader: R,
    device_path: String,
}

impl<R> std::fmt::Debug for JoydevJoystick<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoydevJoystick")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl JoydevJoystick<File> {
    /// Opens the first joystick found under `/dev/input`.
    ///
    /// Candidates are tried in sorted order so the choice is stable when
    /// several sticks are connected.
    ///
    /// # Errors
    ///
    /// - `JoystickNotFound`: no `js*` node could be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use plotjog::joystick::joydev::JoydevJoystick;
    ///
    /// let joystick = JoydevJoystick::open()?;
    /// println!("Using {}", joystick.path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open() -> Result<Self> {
        let candidates = available_sticks(Path::new(INPUT_DIR))?;

        for path in &candidates {
            match Self::open_path(path) {
                Ok(joystick) => return Ok(joystick),
                Err(e) => debug!("Could not open {}: {}", path, e),
            }
        }

        Err(PlotjogError::JoystickNotFound(format!(
            "no usable js* device in {}",
            INPUT_DIR
        )))
    }

    /// Opens a specific joydev node.
    pub fn open_path(path: &str) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| PlotjogError::Joystick(format!("Failed to open {}: {}", path, e)))?;
        info!("Opened joystick at {}", path);
        Ok(Self::from_reader(file, path))
    }
}

impl<R: Read> JoydevJoystick<R> {
    /// Wraps an already open event stream.
    pub fn from_reader(reader: R, device_path: &str) -> Self {
        Self {
            reader,
            device_path: device_path.to_string(),
        }
    }

    /// Device path this joystick was opened from.
    pub fn path(&self) -> &str {
        &self.device_path
    }
}

impl<R: Read + Send + 'static> AxisEventSource for JoydevJoystick<R> {
    /// Records of an unknown type come back as [`Reading::NoEvent`].
    fn next_event(&mut self) -> Result<Reading> {
        let mut raw = [0u8; JS_EVENT_SIZE];
        loop {
            match self.reader.read_exact(&mut raw) {
                Ok(()) => break,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(Reading::Closed),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(PlotjogError::Joystick(format!(
                        "Failed to read {}: {}",
                        self.device_path, e
                    )))
                }
            }
        }

        Ok(decode_event(&raw).map_or(Reading::NoEvent, Reading::Event))
    }

    fn device_path(&self) -> &str {
        &self.device_path
    }
}

/// Lists `js*` nodes in `dir`, sorted.
pub fn available_sticks(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Err(PlotjogError::JoystickNotFound(format!(
            "{} directory not found",
            dir.display()
        )));
    }

    let mut sticks: Vec<String> = std::fs::read_dir(dir)
        .map_err(|e| PlotjogError::Joystick(format!("Failed to read {}: {}", dir.display(), e)))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("js"))
        .map(|entry| entry.path().to_string_lossy().to_string())
        .collect();
    sticks.sort();
    Ok(sticks)
}
