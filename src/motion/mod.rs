//! # Motion Module
//!
//! The motion-intent pipeline core.
//!
//! This module handles:
//! - Folding single-axis changes into a two-axis intent vector
//! - Sampling that vector at the command cadence with a noise floor
//! - Handing the freshest target to the actuation task
//! - Formatting relative move commands

pub mod aggregator;
pub mod command;
pub mod mailbox;
pub mod sampler;
