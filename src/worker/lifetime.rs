//! Application lifetime signal
//!
//! The worker receives an [`ApplicationLifetime`] at construction and calls
//! [`ApplicationLifetime::request_shutdown`] when its run sequence ends. The
//! host awaits [`ApplicationLifetime::stopping`] to learn that the process
//! should exit.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct ApplicationLifetime {
    token: CancellationToken,
    requests: Arc<AtomicU64>,
}

impl ApplicationLifetime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the host to stop the whole application
    pub fn request_shutdown(&self) {
        let previous = self.requests.fetch_add(1, Ordering::SeqCst);
        info!(requests = previous + 1, "Application shutdown requested");
        self.token.cancel();
    }

    /// Resolves once shutdown has been requested
    pub fn stopping(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    pub fn is_stopping(&self) -> bool {
        self.token.is_cancelled()
    }

    /// How many times shutdown was requested over the lifetime
    pub fn shutdown_requests(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }
}
