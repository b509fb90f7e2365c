//! Heartbeat worker service
//!
//! A single background task that writes a heartbeat to the structured log
//! and to the plain-text journal on a fixed cadence, drains once when it
//! stops, and then asks the application to shut down.

pub mod health;
pub mod journal;
pub mod lifetime;
pub mod service;

pub use health::{AlwaysHealthy, HealthCheck};
pub use journal::{Journal, JournalEntry, Phase};
pub use lifetime::ApplicationLifetime;
pub use service::{ServiceWorker, WorkerHandle};

use crate::config::{Config, ConfigError, FlushPolicy};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Journal I/O failed: {0}")]
    Journal(#[from] std::io::Error),

    #[error("Journal is not open (on_start was not called or the worker already drained)")]
    JournalClosed,

    #[error("Health check failed on heartbeat {seq}: {reason}")]
    HealthCheck { seq: u64, reason: String },

    #[error("Heartbeat loop panicked: {0}")]
    Panicked(String),

    #[error("Worker did not stop within {0:?}")]
    StopTimedOut(Duration),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, WorkerError>;

/// Worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub journal_path: PathBuf,
    pub flush: FlushPolicy,
    pub heartbeat_interval: Duration,
    pub drain_delay: Duration,
}

impl WorkerConfig {
    /// Build from loaded configuration, resolving the journal location
    pub fn from_config(config: &Config) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            journal_path: config.journal_path()?,
            flush: config.journal.flush,
            heartbeat_interval: config.worker.heartbeat_interval.as_duration(),
            drain_delay: config.worker.drain_delay.as_duration(),
        })
    }
}

/// Worker lifecycle. There is no way back to `Running` once stopping begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// How the heartbeat loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    Cancelled,
    Faulted(String),
}
