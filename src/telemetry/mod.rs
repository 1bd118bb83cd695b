//! # Telemetry Module
//!
//! Records executed moves to a JSONL (JSON Lines) journal.
//!
//! This module handles:
//! - Formatting each completed activation as one JSON object
//! - Appending records to the journal file

pub mod journal;

pub use journal::{MoveJournal, MoveRecord};
