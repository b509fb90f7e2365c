//! Tracing setup and worker counters

use crate::config::{LogFormat, TelemetryConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured filter when it is set.
pub fn init(config: &TelemetryConfig) -> Result<(), AnyError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))?;

    match config.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init(),
    }
}

/// Counters for the worker lifecycle
#[derive(Debug, Default)]
pub struct Metrics {
    heartbeats: AtomicU64,
    faults: AtomicU64,
    drains: AtomicU64,
    journal_lines: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heartbeat(&self) {
        self.heartbeats.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "heartbeats", "Metric incremented");
    }

    pub fn fault(&self) {
        self.faults.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "faults", "Metric incremented");
    }

    pub fn drained(&self) {
        self.drains.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "drains", "Metric incremented");
    }

    pub fn journal_line(&self) {
        self.journal_lines.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            heartbeats: self.heartbeats.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
            drains: self.drains.load(Ordering::Relaxed),
            journal_lines: self.journal_lines.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub heartbeats: u64,
    pub faults: u64,
    pub drains: u64,
    pub journal_lines: u64,
}
