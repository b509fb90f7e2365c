use super::models::Config;
use std::path::{MAIN_SEPARATOR, Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("heartbeat_interval must be greater than zero")]
    ZeroHeartbeatInterval,

    #[error("drain_delay ({drain}) must be shorter than shutdown_timeout ({timeout})")]
    DrainExceedsShutdownTimeout { drain: String, timeout: String },

    #[error("Journal path is empty")]
    EmptyJournalPath,

    #[error("Journal path '{path}' does not name a file")]
    JournalPathNotAFile { path: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_worker(config)?;
    validate_journal(config)?;
    Ok(())
}

/// The loop needs a real cadence, and draining has to finish inside the stop window
fn validate_worker(config: &Config) -> Result<(), ValidationError> {
    let worker = &config.worker;

    if worker.heartbeat_interval.is_zero() {
        return Err(ValidationError::ZeroHeartbeatInterval);
    }

    if worker.drain_delay >= worker.shutdown_timeout {
        return Err(ValidationError::DrainExceedsShutdownTimeout {
            drain: worker.drain_delay.to_string(),
            timeout: worker.shutdown_timeout.to_string(),
        });
    }

    Ok(())
}

fn validate_journal(config: &Config) -> Result<(), ValidationError> {
    let path: &Path = &config.journal.path;

    if path.as_os_str().is_empty() {
        return Err(ValidationError::EmptyJournalPath);
    }

    let raw = path.to_string_lossy();
    if raw.ends_with('/') || raw.ends_with(MAIN_SEPARATOR) || path.file_name().is_none() {
        return Err(ValidationError::JournalPathNotAFile {
            path: raw.into_owned(),
        });
    }

    Ok(())
}
