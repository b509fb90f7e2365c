//! Process host: wires config, worker and OS signals together

use crate::config::Config;
use crate::observability::Metrics;
use crate::worker::{ApplicationLifetime, ExitReason, ServiceWorker, WorkerConfig};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Run the worker until it ends on its own or the process is signalled
pub async fn run(config: Config) -> Result<ExitReason, AnyError> {
    run_until(config, shutdown_signal()).await
}

/// Like [`run`], with the external stop trigger supplied by the caller
pub async fn run_until<F>(config: Config, stop: F) -> Result<ExitReason, AnyError>
where
    F: std::future::Future<Output = ()>,
{
    let lifetime = ApplicationLifetime::new();
    let metrics = Arc::new(Metrics::new());
    let worker_config = WorkerConfig::from_config(&config)?;

    info!(journal = %worker_config.journal_path.display(), "Starting logbeat host");

    let cancel = CancellationToken::new();
    let mut worker = ServiceWorker::new(worker_config, lifetime.clone(), Arc::clone(&metrics));
    worker.on_start(&cancel)?;
    let handle = worker.run(cancel);

    tokio::select! {
        _ = stop => info!("Shutdown signal received"),
        _ = lifetime.stopping() => info!("Worker requested application shutdown"),
    }

    let reason = handle
        .on_stop(config.worker.shutdown_timeout.as_duration())
        .await?;

    let snapshot = metrics.snapshot();
    match &reason {
        ExitReason::Cancelled => info!(?snapshot, "Host stopped"),
        // Loop faults are logged by the worker and do not fail the process
        ExitReason::Faulted(message) => warn!(?snapshot, fault = %message, "Host stopped after worker fault"),
    }

    Ok(reason)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
