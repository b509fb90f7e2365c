//! Plain-text journal written alongside the structured log
//!
//! One record per line: `<local-timestamp> : [<phase>] <message>`.
//! The file is truncated when the worker starts and held open until the
//! drain sequence closes it.

use crate::config::FlushPolicy;
use chrono::{Local, NaiveDateTime};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Lifecycle phase a record was written from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Start,
    Running,
    Error,
    Stopping,
    Stopped,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Start => "start",
            Phase::Running => "running",
            Phase::Error => "error",
            Phase::Stopping => "stopping",
            Phase::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryParseError {
    #[error("missing ' : [' separator")]
    MissingSeparator,

    #[error("missing '] ' after phase")]
    UnterminatedPhase,

    #[error("unknown phase: {0}")]
    UnknownPhase(String),

    #[error("bad timestamp '{0}'")]
    BadTimestamp(String),
}

impl FromStr for Phase {
    type Err = EntryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Phase::Start),
            "running" => Ok(Phase::Running),
            "error" => Ok(Phase::Error),
            "stopping" => Ok(Phase::Stopping),
            "stopped" => Ok(Phase::Stopped),
            other => Err(EntryParseError::UnknownPhase(other.to_string())),
        }
    }
}

/// A parsed journal line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub timestamp: NaiveDateTime,
    pub phase: Phase,
    pub message: String,
}

impl FromStr for JournalEntry {
    type Err = EntryParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (timestamp, rest) = line
            .split_once(" : [")
            .ok_or(EntryParseError::MissingSeparator)?;
        let (phase, message) = rest
            .split_once("] ")
            .ok_or(EntryParseError::UnterminatedPhase)?;

        let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .map_err(|_| EntryParseError::BadTimestamp(timestamp.to_string()))?;

        Ok(JournalEntry {
            timestamp,
            phase: phase.parse()?,
            message: message.to_string(),
        })
    }
}

/// Render one record, newline included. Line breaks inside `message` are flattened.
pub fn format_line(timestamp: &NaiveDateTime, phase: Phase, message: &str) -> String {
    let message = message.replace(['\r', '\n'], " ");
    format!("{} : [{}] {}\n", timestamp.format(TIMESTAMP_FORMAT), phase, message)
}

/// Parse every line of a journal file
pub fn read_entries(path: &Path) -> io::Result<Vec<JournalEntry>> {
    std::fs::read_to_string(path)?
        .lines()
        .map(|line| {
            line.parse::<JournalEntry>()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("{}: {}", e, line)))
        })
        .collect()
}

/// Single-writer handle to the journal file
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    writer: BufWriter<File>,
    flush: FlushPolicy,
    lines: u64,
}

impl Journal {
    /// Create the journal, truncating any previous content
    pub fn create(path: impl Into<PathBuf>, flush: FlushPolicy) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            flush,
            lines: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records written through this handle
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Append one record stamped with the current local time
    pub fn append(&mut self, phase: Phase, message: &str) -> io::Result<()> {
        let line = format_line(&Local::now().naive_local(), phase, message);
        self.writer.write_all(line.as_bytes())?;
        self.lines += 1;

        if self.flush == FlushPolicy::EveryLine {
            self.writer.flush()?;
        }

        Ok(())
    }

    /// Flush buffered records and sync them to disk, releasing the handle
    pub fn close(mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }
}
