//! # Evdev Joystick Module
//!
//! Reads a joystick through the Linux event interface (`/dev/input/event*`).
//!
//! ## Device Detection
//!
//! Any event device that reports both `ABS_X` and `ABS_Y` is accepted. The
//! first match in sorted path order wins.
//!
//! ## Axis Normalization
//!
//! Raw axis readings are mapped from the device's reported `[minimum, maximum]`
//! range onto `[-1.0, 1.0]`. `ABS_X` and `ABS_Y` carry codes 0 and 1, which line
//! up with the joydev axis numbering.

use evdev::{AbsoluteAxisType, Device, InputEvent, InputEventKind};
use std::collections::VecDeque;
use std::path::Path;
use std::time::UNIX_EPOCH;
use tracing::{debug, info};

use super::{AxisEventSource, EventKind, JoystickEvent, Reading};
use crate::error::{PlotjogError, Result};

const INPUT_DIR: &str = "/dev/input";

/// Raw range of one absolute axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub minimum: i32,
    pub maximum: i32,
}

impl AxisRange {
    /// Maps a raw reading onto [-1.0, 1.0].
    #[must_use]
    pub fn normalize(&self, value: i32) -> f32 {
        let span = self.maximum as f32 - self.minimum as f32;
        if span <= 0.0 {
            return 0.0;
        }
        let fraction = (value as f32 - self.minimum as f32) / span;
        (fraction * 2.0 - 1.0).clamp(-1.0, 1.0)
    }
}

/// Converts an evdev event into a joystick event.
///
/// Absolute axes without a known range, sync events and everything other
/// than axes and keys are dropped.
#[must_use]
pub fn map_event(event: &InputEvent, ranges: &[AxisRange]) -> Option<JoystickEvent> {
    let time_ms = event
        .timestamp()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u32)
        .unwrap_or(0);

    match event.kind() {
        InputEventKind::AbsAxis(axis) => {
            let range = ranges.get(usize::from(axis.0))?;
            Some(JoystickEvent {
                time_ms,
                kind: EventKind::Axis,
                number: u8::try_from(axis.0).ok()?,
                value: range.normalize(event.value()),
                initial: false,
            })
        }
        InputEventKind::Key(key) => Some(JoystickEvent {
            time_ms,
            kind: EventKind::Button,
            // Low byte of the key code
            number: (key.code() & 0xff) as u8,
            value: if event.value() != 0 { 1.0 } else { 0.0 },
            initial: false,
        }),
        _ => None,
    }
}

/// Joystick opened through evdev.
pub struct EvdevJoystick {
    device: Device,
    device_path: String,
    ranges: Vec<AxisRange>,
    pending: VecDeque<JoystickEvent>,
}

impl std::fmt::Debug for EvdevJoystick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevJoystick")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl EvdevJoystick {
    /// Detect and open the first event device with an X/Y stick
    ///
    /// # Errors
    ///
    /// - `JoystickNotFound`: no event device reports both stick axes
    /// - `Joystick`: `/dev/input` could not be listed
    pub fn open() -> Result<Self> {
        let input_dir = Path::new(INPUT_DIR);

        if !input_dir.exists() {
            return Err(PlotjogError::JoystickNotFound(
                "/dev/input directory not found".to_string(),
            ));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| PlotjogError::Joystick(format!("Failed to read /dev/input: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| PlotjogError::Joystick(format!("Failed to read directory entry: {}", e)))?;

        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();

            if !path
                .file_name()
                .map_or(false, |name| name.to_string_lossy().starts_with("event"))
            {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => {
                    debug!(
                        "Found input device: {} ({})",
                        path.display(),
                        device.name().unwrap_or("unnamed")
                    );

                    if has_stick(&device) {
                        return Self::from_device(device, &path.to_string_lossy());
                    }
                }
                Err(e) => {
                    // Permission denied or other errors - skip device
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        Err(PlotjogError::JoystickNotFound(
            "no event device with ABS_X and ABS_Y".to_string(),
        ))
    }

    /// Opens a specific event device.
    pub fn open_path(path: &str) -> Result<Self> {
        let device = Device::open(path)
            .map_err(|e| PlotjogError::Joystick(format!("Failed to open {}: {}", path, e)))?;

        if !has_stick(&device) {
            return Err(PlotjogError::JoystickNotFound(format!(
                "{} does not report ABS_X and ABS_Y",
                path
            )));
        }

        Self::from_device(device, path)
    }

    fn from_device(device: Device, device_path: &str) -> Result<Self> {
        let ranges = device
            .get_abs_state()
            .map_err(|e| PlotjogError::Joystick(format!("Failed to read axis ranges: {}", e)))?
            .iter()
            .map(|info| AxisRange {
                minimum: info.minimum,
                maximum: info.maximum,
            })
            .collect();

        info!(
            "Opened joystick {} at {}",
            device.name().unwrap_or("unnamed"),
            device_path
        );

        Ok(Self {
            device,
            device_path: device_path.to_string(),
            ranges,
            pending: VecDeque::new(),
        })
    }

    /// Returns the human-readable device name.
    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }
}

impl AxisEventSource for EvdevJoystick {
    /// A batch holding only sync or unmapped events yields [`Reading::NoEvent`].
    fn next_event(&mut self) -> Result<Reading> {
        if self.pending.is_empty() {
            let ranges = &self.ranges;
            let batch = self
                .device
                .fetch_events()
                .map_err(|e| PlotjogError::Joystick(format!("Failed to fetch events: {}", e)))?;
            self.pending
                .extend(batch.filter_map(|event| map_event(&event, ranges)));
        }
        Ok(self.pending.pop_front().map_or(Reading::NoEvent, Reading::Event))
    }

    fn device_path(&self) -> &str {
        &self.device_path
    }
}

fn has_stick(device: &Device) -> bool {
    device.supported_absolute_axes().map_or(false, |axes| {
        axes.contains(AbsoluteAxisType::ABS_X) && axes.contains(AbsoluteAxisType::ABS_Y)
    })
}
