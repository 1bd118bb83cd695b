//! JSONL journal of executed moves.
//!
//! One line per activation:
//!
//! ```text
//! {"timestamp":"2024-05-01T12:00:00.000+00:00","dx":0.1,"dy":-0.1,"commands":["G91","G1 X0.100 Y0.100 F400"],"responses":["ok","ok"]}
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{PlotjogError, Result};

/// One executed activation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MoveRecord {
    pub timestamp: DateTime<Utc>,
    pub dx: f32,
    pub dy: f32,
    pub commands: Vec<String>,
    pub responses: Vec<String>,
}

/// Append-only move journal.
#[derive(Debug)]
pub struct MoveJournal {
    writer: BufWriter<File>,
    path: PathBuf,
    records: u64,
}

impl MoveJournal {
    /// Opens (or creates) the journal, creating parent directories.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                PlotjogError::Journal(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| PlotjogError::Journal(format!("Failed to open {}: {}", path.display(), e)))?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
            records: 0,
        })
    }

    /// Appends a record and flushes it to disk.
    pub fn append(&mut self, record: &MoveRecord) -> Result<()> {
        let line = serde_json::to_string(record)
            .map_err(|e| PlotjogError::Journal(format!("Failed to encode record: {}", e)))?;
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        self.records += 1;
        Ok(())
    }

    /// Records written since open.
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MoveJournal {
    fn drop(&mut self) {
        info!(
            "Closed move journal {} ({} records this session)",
            self.path.display(),
            self.records()
        );
    }
}
