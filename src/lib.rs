//! # Plotjog Library
//!
//! Jog a G-code plotter or 3D printer with a joystick over a serial link.
//!
//! This library turns continuous joystick deflection into a rate-limited
//! stream of relative `G1` moves, always acting on the freshest stick
//! position and never queueing stale ones behind a slow controller.

pub mod actuator;
pub mod config;
pub mod error;
pub mod joystick;
pub mod motion;
pub mod pipeline;
pub mod serial;
pub mod telemetry;
