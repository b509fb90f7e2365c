//! Per-tick health check
//!
//! The worker runs its [`HealthCheck`] before every heartbeat. A failing check
//! is a fault: the loop ends and the worker shuts the application down.

use async_trait::async_trait;

/// Check run before each heartbeat record
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// `seq` starts at 1 for the first heartbeat
    async fn check(&self, seq: u64) -> Result<(), String>;
}

/// Health check that never fails
#[derive(Debug, Clone, Default)]
pub struct AlwaysHealthy;

#[async_trait]
impl HealthCheck for AlwaysHealthy {
    async fn check(&self, seq: u64) -> Result<(), String> {
        tracing::trace!(seq, "Health check passed");
        Ok(())
    }
}
