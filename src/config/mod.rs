//! Configuration management for logbeat
//!
//! Settings are layered from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use logbeat::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Heartbeat every {}", config.worker.heartbeat_interval);
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `LOGBEAT__<section>__<key>`:
//! - `LOGBEAT__WORKER__HEARTBEAT_INTERVAL=5s`
//! - `LOGBEAT__JOURNAL__PATH=/var/log/logbeat.log`
//! - `LOGBEAT__TELEMETRY__LOG_FORMAT=json`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/logbeat.toml`.
//! This can be overridden using the `LOGBEAT_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use models::{
    Config, FlushPolicy, JournalConfig, LogFormat, TelemetryConfig, WorkerSettings,
};
pub use sources::ConfigOrigin;
pub use validation::ValidationError;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Cannot determine executable directory: {0}")]
    BaseDir(#[from] std::io::Error),

    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or
    /// validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _) = Self::resolve(None, None)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let (config, _) = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load for the CLI: optional config file, optional journal override
    ///
    /// The override is applied before validation so it gets the same checks
    /// as a configured path.
    pub fn resolve(
        path: Option<PathBuf>,
        journal: Option<PathBuf>,
    ) -> Result<(Self, ConfigOrigin), ConfigError> {
        let (mut config, origin) = sources::load(path)?;
        if let Some(journal) = journal {
            config.journal.path = journal;
        }
        validation::validate(&config)?;
        Ok((config, origin))
    }

    /// Journal location anchored at the directory holding the running executable
    pub fn journal_path(&self) -> Result<PathBuf, ConfigError> {
        if self.journal.path.is_absolute() {
            return Ok(self.journal.path.clone());
        }

        let exe = std::env::current_exe()?;
        let base_dir = exe.parent().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} has no parent directory", exe.display()),
            )
        })?;

        Ok(self.journal.resolve_path(base_dir))
    }

    /// Effective configuration rendered back as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
