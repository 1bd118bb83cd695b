//! # Move Commands
//!
//! G-code lines sent to the motion controller and classification of the
//! lines it answers with.
//!
//! Every activation sends exactly two lines, in this order:
//!
//! ```text
//! G91
//! G1 X{dx:.3} Y{-dy:.3} F{feed_rate}
//! ```
//!
//! The Y axis is negated because pushing the stick up reports a negative
//! value while the device's positive Y points away from the operator.

use std::fmt;

use super::sampler::SampledTarget;

/// Switch the controller to relative positioning.
pub const RELATIVE_MODE: &str = "G91";

/// One relative move activation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveCommand {
    pub dx: f32,
    pub dy: f32,
    pub feed_rate: u32,
}

impl MoveCommand {
    /// Builds the activation for a sampled target.
    #[must_use]
    pub fn relative(target: SampledTarget, feed_rate: u32) -> Self {
        Self {
            dx: target.dx,
            dy: target.dy,
            feed_rate,
        }
    }

    /// The `G1` line for this move.
    #[must_use]
    pub fn move_line(&self) -> String {
        format!(
            "G1 X{} Y{} F{}",
            millimeters(self.dx),
            millimeters(-self.dy),
            self.feed_rate
        )
    }

    /// Both lines, in send order.
    #[must_use]
    pub fn lines(&self) -> [String; 2] {
        [RELATIVE_MODE.to_string(), self.move_line()]
    }
}

impl fmt::Display for MoveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}; {}", RELATIVE_MODE, self.move_line())
    }
}

/// Three decimals, never `-0.000`.
fn millimeters(value: f32) -> String {
    let text = format!("{:.3}", value);
    if text == "-0.000" {
        "0.000".to_string()
    } else {
        text
    }
}

/// A response line from the motion controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    /// `ok`, optionally followed by extra fields
    Ok,
    /// The controller reported an error
    Error(String),
    /// Anything else (echo, busy, status)
    Other(String),
}

impl Ack {
    /// Classifies a trimmed response line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let lower = line.to_ascii_lowercase();
        if lower == "ok" || lower.starts_with("ok ") {
            Ack::Ok
        } else if lower.starts_with("error") || line.starts_with("!!") {
            Ack::Error(line.to_string())
        } else {
            Ack::Other(line.to_string())
        }
    }

    /// Whether the controller reported an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Ack::Error(_))
    }
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ack::Ok => f.write_str("ok"),
            Ack::Error(text) | Ack::Other(text) => f.write_str(text),
        }
    }
}
