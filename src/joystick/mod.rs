//! # Joystick Module
//!
//! Joystick device readers.
//!
//! This module handles:
//! - Detecting and opening a joystick (joydev or evdev interface)
//! - Decoding device events into [`JoystickEvent`]s
//! - Filtering the two stick axes out of the event stream
//!
//! Readers block until the next event, so the pipeline drives them from a
//! dedicated reader thread.

pub mod evdev_source;
pub mod joydev;

use crate::config::{InputBackend, InputConfig};
use crate::error::Result;

/// Horizontal stick axis index.
pub const AXIS_X: u8 = 0;
/// Vertical stick axis index.
pub const AXIS_Y: u8 = 1;

/// Kind of a joystick state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Axis,
    Button,
}

/// One decoded joystick state change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoystickEvent {
    /// Device timestamp in milliseconds. Wraps around.
    pub time_ms: u32,
    pub kind: EventKind,
    /// Axis or button index
    pub number: u8,
    /// Normalized value: [-1.0, 1.0] for axes, 0.0 or 1.0 for buttons
    pub value: f32,
    /// Synthetic event reporting the state at open time
    pub initial: bool,
}

/// A change on one of the stick axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisChange {
    pub axis: u8,
    pub value: f32,
}

impl JoystickEvent {
    /// Returns the axis change if this event moved the X or Y stick axis.
    #[must_use]
    pub fn stick_change(&self) -> Option<AxisChange> {
        match (self.kind, self.number) {
            (EventKind::Axis, AXIS_X | AXIS_Y) => Some(AxisChange {
                axis: self.number,
                value: self.value,
            }),
            _ => None,
        }
    }
}

/// Outcome of one blocking read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// A decoded state change
    Event(JoystickEvent),
    /// The read completed without a usable event. Not an error.
    NoEvent,
    /// The device will deliver no further events
    Closed,
}

impl From<JoystickEvent> for Reading {
    fn from(event: JoystickEvent) -> Self {
        Reading::Event(event)
    }
}

/// Blocking source of joystick events.
pub trait AxisEventSource: Send + 'static {
    /// Waits for the next read to complete.
    fn next_event(&mut self) -> Result<Reading>;

    /// Path of the underlying device, for logging.
    fn device_path(&self) -> &str;
}

/// Opens the configured joystick backend.
///
/// An empty `device_path` auto-detects the first suitable device.
pub fn open(config: &InputConfig) -> Result<Box<dyn AxisEventSource>> {
    let path = (!config.device_path.is_empty()).then_some(config.device_path.as_str());
    match config.backend {
        InputBackend::Joydev => {
            let device = match path {
                Some(path) => joydev::JoydevJoystick::open_path(path)?,
                None => joydev::JoydevJoystick::open()?,
            };
            Ok(Box::new(device))
        }
        InputBackend::Evdev => {
            let device = match path {
                Some(path) => evdev_source::EvdevJoystick::open_path(path)?,
                None => evdev_source::EvdevJoystick::open()?,
            };
            Ok(Box::new(device))
        }
    }
}

impl<S: AxisEventSource + ?Sized> AxisEventSource for Box<S> {
    fn next_event(&mut self) -> Result<Reading> {
        (**self).next_event()
    }

    fn device_path(&self) -> &str {
        (**self).device_path()
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;

    /// Replays a fixed list of readings, then reports end of input.
    pub struct ScriptedSource {
        pub readings: VecDeque<Reading>,
    }

    impl ScriptedSource {
        pub fn new(events: impl IntoIterator<Item = JoystickEvent>) -> Self {
            Self::from_readings(events.into_iter().map(Reading::from))
        }

        pub fn from_readings(readings: impl IntoIterator<Item = Reading>) -> Self {
            Self { readings: readings.into_iter().collect() }
        }
    }

    impl AxisEventSource for ScriptedSource {
        fn next_event(&mut self) -> Result<Reading> {
            Ok(self.readings.pop_front().unwrap_or(Reading::Closed))
        }

        fn device_path(&self) -> &str {
            "scripted"
        }
    }

    /// Blocks until the test feeds a reading; ends when the sender is dropped.
    pub struct ChannelSource {
        pub rx: std::sync::mpsc::Receiver<Reading>,
    }

    impl ChannelSource {
        pub fn new() -> (std::sync::mpsc::Sender<Reading>, Self) {
            let (tx, rx) = std::sync::mpsc::channel();
            (tx, Self { rx })
        }
    }

    impl AxisEventSource for ChannelSource {
        fn next_event(&mut self) -> Result<Reading> {
            Ok(self.rx.recv().unwrap_or(Reading::Closed))
        }

        fn device_path(&self) -> &str {
            "channel"
        }
    }

    /// Fails on the first read.
    pub struct FailingSource;

    impl AxisEventSource for FailingSource {
        fn next_event(&mut self) -> Result<Reading> {
            Err(crate::error::PlotjogError::Joystick("device unplugged".to_string()))
        }

        fn device_path(&self) -> &str {
            "failing"
        }
    }

    pub fn axis(number: u8, value: f32) -> JoystickEvent {
        JoystickEvent { time_ms: 0, kind: EventKind::Axis, number, value, initial: false }
    }

    pub fn button(number: u8, pressed: bool) -> JoystickEvent {
        JoystickEvent {
            time_ms: 0,
            kind: EventKind::Button,
            number,
            value: if pressed { 1.0 } else { 0.0 },
            initial: false,
        }
    }
}
