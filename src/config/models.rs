use crate::humanize::HumanDuration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub worker: WorkerSettings,
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Heartbeat loop timing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerSettings {
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval: HumanDuration,
    /// Fixed pause between the "stopping" and "stopped" records
    #[serde(default = "default_drain_delay")]
    pub drain_delay: HumanDuration,
    /// How long the host waits for the worker to finish once stop is requested
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: HumanDuration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: default_heartbeat_interval(),
            drain_delay: default_drain_delay(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

fn default_heartbeat_interval() -> HumanDuration {
    HumanDuration::from_secs(2)
}

fn default_drain_delay() -> HumanDuration {
    HumanDuration::from_secs(3)
}

fn default_shutdown_timeout() -> HumanDuration {
    HumanDuration::from_secs(30)
}

/// When buffered journal records reach the disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushPolicy {
    #[default]
    EveryLine,
    OnShutdown,
}

/// Journal file configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JournalConfig {
    /// Journal location; relative paths resolve against the executable's directory
    #[serde(default = "default_journal_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub flush: FlushPolicy,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            path: default_journal_path(),
            flush: FlushPolicy::default(),
        }
    }
}

fn default_journal_path() -> PathBuf {
    PathBuf::from("LogInfo.log")
}

impl JournalConfig {
    /// Absolute journal path, anchored at `base_dir` when configured relative
    pub fn resolve_path(&self, base_dir: &std::path::Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            base_dir.join(&self.path)
        }
    }
}

/// Output format of the structured log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub log_format: LogFormat,
    /// Default `EnvFilter` directive, `RUST_LOG` takes precedence
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}
