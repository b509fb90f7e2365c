//! The heartbeat worker and its lifecycle hooks

use super::health::{AlwaysHealthy, HealthCheck};
use super::journal::{Journal, Phase};
use super::lifetime::ApplicationLifetime;
use super::{ExitReason, Result, WorkerConfig, WorkerError, WorkerState};
use crate::observability::Metrics;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

const STARTED: &str = "Service started.";
const RUNNING: &str = "Service is running.";
const STOPPING: &str = "Service is stopping.";
const STOPPED: &str = "Service stopped.";

/// Background worker writing heartbeats to the log and the journal
pub struct ServiceWorker {
    config: WorkerConfig,
    run_id: Uuid,
    health: Arc<dyn HealthCheck>,
    lifetime: ApplicationLifetime,
    metrics: Arc<Metrics>,
    state: watch::Sender<WorkerState>,
    journal: Option<Journal>,
}

impl ServiceWorker {
    pub fn new(
        config: WorkerConfig,
        lifetime: ApplicationLifetime,
        metrics: Arc<Metrics>,
    ) -> Self {
        let (state, _) = watch::channel(WorkerState::Created);

        Self {
            config,
            run_id: Uuid::now_v7(),
            health: Arc::new(AlwaysHealthy),
            lifetime,
            metrics,
            state,
            journal: None,
        }
    }

    /// Replace the per-tick health check
    pub fn with_health_check(mut self, health: Arc<dyn HealthCheck>) -> Self {
        self.health = health;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Create the journal and write the start record
    ///
    /// The token is accepted for symmetry with [`WorkerHandle::on_stop`]; nothing
    /// here is cancellable.
    pub fn on_start(&mut self, _cancel: &CancellationToken) -> Result<()> {
        self.state.send_replace(WorkerState::Starting);

        let journal = Journal::create(&self.config.journal_path, self.config.flush)?;
        self.journal = Some(journal);
        self.record(Phase::Start, STARTED)?;

        info!(
            run_id = %self.run_id,
            journal = %self.config.journal_path.display(),
            interval = ?self.config.heartbeat_interval,
            "Service has been requested to start."
        );

        Ok(())
    }

    /// Spawn the heartbeat task
    pub fn run(self, cancel: CancellationToken) -> WorkerHandle {
        let state = self.state.subscribe();
        self.state.send_replace(WorkerState::Running);

        let span = info_span!("worker", run_id = %self.run_id);
        let task = tokio::spawn(self.execute(cancel.clone()).instrument(span));

        WorkerHandle {
            cancel,
            task,
            state,
        }
    }

    /// Loop, then drain and request shutdown no matter how the loop ended
    async fn execute(mut self, cancel: CancellationToken) -> ExitReason {
        let outcome = AssertUnwindSafe(self.heartbeat_loop(&cancel))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(WorkerError::Panicked(panic_message(panic))));

        let reason = match outcome {
            Ok(()) => ExitReason::Cancelled,
            Err(e) => {
                self.metrics.fault();
                error!(error = %e, "Service loop failed");
                let message = e.to_string();
                if let Err(record_err) = self.record(Phase::Error, &message) {
                    warn!(error = %record_err, "Failed to journal loop failure");
                }
                ExitReason::Faulted(message)
            }
        };

        self.drain().await;
        self.lifetime.request_shutdown();

        reason
    }

    async fn heartbeat_loop(&mut self, cancel: &CancellationToken) -> Result<()> {
        let period = self.config.heartbeat_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut seq = 0u64;

        loop {
            // A tick already due wins over a cancellation that arrived at the same instant
            tokio::select! {
                biased;
                _ = ticker.tick() => {
                    seq += 1;
                    self.health
                        .check(seq)
                        .await
                        .map_err(|reason| WorkerError::HealthCheck { seq, reason })?;

                    info!(seq, "{}", RUNNING);
                    self.record(Phase::Running, RUNNING)?;
                    self.metrics.heartbeat();
                }
                () = cancel.cancelled() => {
                    info!(heartbeats = seq, "Cancellation observed, leaving heartbeat loop");
                    return Ok(());
                }
            }
        }
    }

    /// Runs once per worker: the only caller is `execute`, which consumes the worker
    async fn drain(&mut self) {
        self.state.send_replace(WorkerState::Stopping);

        info!("{}", STOPPING);
        self.record_or_warn(Phase::Stopping, STOPPING);

        tokio::time::sleep(self.config.drain_delay).await;

        info!("{}", STOPPED);
        self.record_or_warn(Phase::Stopped, STOPPED);

        if let Some(journal) = self.journal.take() {
            let path = journal.path().display().to_string();
            let lines = journal.lines();
            match journal.close() {
                Ok(()) => info!(journal = %path, lines, "Journal closed"),
                Err(e) => warn!(journal = %path, lines, error = %e, "Failed to close journal"),
            }
        }

        self.metrics.drained();
        self.state.send_replace(WorkerState::Stopped);
    }

    fn record(&mut self, phase: Phase, message: &str) -> Result<()> {
        let journal = self.journal.as_mut().ok_or(WorkerError::JournalClosed)?;
        journal.append(phase, message)?;
        self.metrics.journal_line();
        Ok(())
    }

    fn record_or_warn(&mut self, phase: Phase, message: &str) {
        if let Err(e) = self.record(phase, message) {
            warn!(%phase, error = %e, "Failed to write journal record");
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Handle to a running worker task
#[derive(Debug)]
pub struct WorkerHandle {
    cancel: CancellationToken,
    task: JoinHandle<ExitReason>,
    state: watch::Receiver<WorkerState>,
}

impl WorkerHandle {
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.clone()
    }

    /// Cancel the loop and wait up to `timeout` for drain to finish
    ///
    /// The task is aborted if it overruns, in which case the journal may be
    /// missing its final records.
    pub async fn on_stop(self, timeout: Duration) -> Result<ExitReason> {
        info!("Service has been requested to stop.");
        self.cancel.cancel();

        let mut task = self.task;
        match tokio::time::timeout(timeout, &mut task).await {
            Ok(joined) => Ok(joined?),
            Err(_) => {
                task.abort();
                warn!(?timeout, "Worker did not stop in time, aborted");
                Err(WorkerError::StopTimedOut(timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlushPolicy;
    use crate::worker::journal::read_entries;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    struct FailAt(u64);

    #[async_trait]
    impl HealthCheck for FailAt {
        async fn check(&self, seq: u64) -> std::result::Result<(), String> {
            if seq == self.0 {
                Err("disk quota exceeded".to_string())
            } else {
                Ok(())
            }
        }
    }

    struct PanicAt(u64);

    #[async_trait]
    impl HealthCheck for PanicAt {
        async fn check(&self, seq: u64) -> std::result::Result<(), String> {
            if seq == self.0 {
                panic!("check exploded");
            }
            Ok(())
        }
    }

    fn test_config(path: &Path) -> WorkerConfig {
        WorkerConfig {
            journal_path: path.to_path_buf(),
            flush: FlushPolicy::EveryLine,
            heartbeat_interval: Duration::from_secs(2),
            drain_delay: Duration::from_secs(3),
        }
    }

    struct Harness {
        _dir: TempDir,
        path: PathBuf,
        lifetime: ApplicationLifetime,
        metrics: Arc<Metrics>,
    }

    impl Harness {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("LogInfo.log");
            Self {
                _dir: dir,
                path,
                lifetime: ApplicationLifetime::new(),
                metrics: Arc::new(Metrics::new()),
            }
        }

        fn worker(&self) -> ServiceWorker {
            ServiceWorker::new(
                test_config(&self.path),
                self.lifetime.clone(),
                Arc::clone(&self.metrics),
            )
        }

        fn phases(&self) -> Vec<Phase> {
            read_entries(&self.path)
                .unwrap()
                .into_iter()
                .map(|entry| entry.phase)
                .collect()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_two_heartbeats() {
        let harness = Harness::new();
        let cancel = CancellationToken::new();

        let mut worker = harness.worker();
        worker.on_start(&cancel).unwrap();
        let handle = worker.run(cancel.clone());

        tokio::time::sleep(Duration::from_secs(5)).await;
        let reason = handle.on_stop(Duration::from_secs(30)).await.unwrap();

        assert_eq!(reason, ExitReason::Cancelled);
        assert_eq!(
            harness.phases(),
            vec![
                Phase::Start,
                Phase::Running,
                Phase::Running,
                Phase::Stopping,
                Phase::Stopped
            ]
        );
        assert_eq!(harness.lifetime.shutdown_requests(), 1);

        let snapshot = harness.metrics.snapshot();
        assert_eq!(snapshot.heartbeats, 2);
        assert_eq!(snapshot.drains, 1);
        assert_eq!(snapshot.faults, 0);
        assert_eq!(snapshot.journal_lines, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_heartbeat_skips_it() {
        let harness = Harness::new();
        let cancel = CancellationToken::new();

        let mut worker = harness.worker();
        worker.on_start(&cancel).unwrap();
        let handle = worker.run(cancel.clone());

        tokio::time::sleep(Duration::from_millis(1999)).await;
        handle.on_stop(Duration::from_secs(30)).await.unwrap();

        assert_eq!(
            harness.phases(),
            vec![Phase::Start, Phase::Stopping, Phase::Stopped]
        );
        assert_eq!(harness.metrics.snapshot().heartbeats, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_at_boundary_keeps_heartbeat() {
        let harness = Harness::new();
        let cancel = CancellationToken::new();

        let mut worker = harness.worker();
        worker.on_start(&cancel).unwrap();
        let handle = worker.run(cancel.clone());

        // Cancellation lands on the same instant the first tick becomes due
        tokio::time::sleep(Duration::from_millis(2000)).await;
        handle.on_stop(Duration::from_secs(30)).await.unwrap();

        assert_eq!(
            harness.phases(),
            vec![Phase::Start, Phase::Running, Phase::Stopping, Phase::Stopped]
        );
        assert_eq!(harness.metrics.snapshot().heartbeats, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fault_on_first_iteration() {
        let harness = Harness::new();
        let cancel = CancellationToken::new();

        let mut worker = harness.worker().with_health_check(Arc::new(FailAt(1)));
        worker.on_start(&cancel).unwrap();
        let handle = worker.run(cancel.clone());

        // The worker asks for shutdown on its own
        harness.lifetime.stopping().await;
        let reason = handle.on_stop(Duration::from_secs(30)).await.unwrap();

        assert!(matches!(reason, ExitReason::Faulted(ref msg) if msg.contains("disk quota exceeded")));
        assert_eq!(
            harness.phases(),
            vec![Phase::Start, Phase::Error, Phase::Stopping, Phase::Stopped]
        );

        let entries = read_entries(&harness.path).unwrap();
        assert!(entries[1].message.contains("heartbeat 1"));

        assert_eq!(harness.lifetime.shutdown_requests(), 1);
        let snapshot = harness.metrics.snapshot();
        assert_eq!(snapshot.heartbeats, 0);
        assert_eq!(snapshot.faults, 1);
        assert_eq!(snapshot.drains, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_in_loop_is_treated_as_fault() {
        let harness = Harness::new();
        let cancel = CancellationToken::new();

        let mut worker = harness.worker().with_health_check(Arc::new(PanicAt(2)));
        worker.on_start(&cancel).unwrap();
        let handle = worker.run(cancel.clone());

        harness.lifetime.stopping().await;
        let reason = handle.on_stop(Duration::from_secs(30)).await.unwrap();

        assert!(matches!(reason, ExitReason::Faulted(ref msg) if msg.contains("check exploded")));
        assert_eq!(
            harness.phases(),
            vec![
                Phase::Start,
                Phase::Running,
                Phase::Error,
                Phase::Stopping,
                Phase::Stopped
            ]
        );
        assert_eq!(harness.lifetime.shutdown_requests(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_transitions() {
        let harness = Harness::new();
        let cancel = CancellationToken::new();

        let mut worker = harness.worker();
        assert_eq!(*worker.state().borrow(), WorkerState::Created);

        worker.on_start(&cancel).unwrap();
        assert_eq!(*worker.state().borrow(), WorkerState::Starting);

        let handle = worker.run(cancel.clone());
        assert_eq!(handle.state(), WorkerState::Running);

        let mut state = handle.subscribe();
        cancel.cancel();
        state
            .wait_for(|s| *s == WorkerState::Stopping)
            .await
            .unwrap();

        handle.on_stop(Duration::from_secs(30)).await.unwrap();
        assert_eq!(*state.borrow(), WorkerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_times_out_during_drain() {
        let harness = Harness::new();
        let cancel = CancellationToken::new();

        let mut worker = harness.worker();
        worker.on_start(&cancel).unwrap();
        let handle = worker.run(cancel.clone());

        let result = handle.on_stop(Duration::from_secs(1)).await;

        assert!(matches!(result, Err(WorkerError::StopTimedOut(_))));
        assert_eq!(harness.lifetime.shutdown_requests(), 0);
        assert_eq!(harness.metrics.snapshot().drains, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_without_start_faults_and_shuts_down() {
        let harness = Harness::new();
        let cancel = CancellationToken::new();

        let handle = harness.worker().run(cancel.clone());

        harness.lifetime.stopping().await;
        let reason = handle.on_stop(Duration::from_secs(30)).await.unwrap();

        assert!(matches!(reason, ExitReason::Faulted(_)));
        assert!(!harness.path.exists());
        assert_eq!(harness.metrics.snapshot().drains, 1);
    }

    #[test]
    fn test_on_start_fails_for_unwritable_path() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir.path().join("missing").join("LogInfo.log"));
        let mut worker = ServiceWorker::new(
            config,
            ApplicationLifetime::new(),
            Arc::new(Metrics::new()),
        );

        let result = worker.on_start(&CancellationToken::new());
        assert!(matches!(result, Err(WorkerError::Journal(_))));
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new("owned".to_string())), "owned");
        assert_eq!(panic_message(Box::new(42u8)), "unknown panic payload");
    }
}
