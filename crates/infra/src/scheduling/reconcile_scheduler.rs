//! Interval scheduler for reconciliation runs.
//!
//! Drives [`ReconcileService::reconcile_all`] on a fixed interval with
//! lifecycle management. Each tick logs one structured line per vendor;
//! failed vendors are reported and retried on the next tick rather than
//! aborting the loop.

use std::sync::Arc;
use std::time::Duration;

use seatsync_core::ReconcileService;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for the reconcile scheduler
#[derive(Debug, Clone)]
pub struct ReconcileSchedulerConfig {
    /// Interval between runs
    pub interval: Duration,
}

impl Default for ReconcileSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600), // hourly
        }
    }
}

/// Interval scheduler for reconciliation runs
pub struct ReconcileScheduler {
    service: Arc<ReconcileService>,
    config: ReconcileSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl ReconcileScheduler {
    /// Create a new reconcile scheduler.
    pub fn new(service: Arc<ReconcileService>, config: ReconcileSchedulerConfig) -> Self {
        Self {
            service,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the scheduler.
    ///
    /// Spawns a background task that runs reconciliation periodically.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(interval_secs = self.config.interval.as_secs(), "Starting reconcile scheduler");

        // Create a new cancellation token (supports restart after stop)
        self.cancellation_token = CancellationToken::new();

        let service = Arc::clone(&self.service);
        let interval = self.config.interval;
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::run_loop(service, interval, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);

        info!("Reconcile scheduler started");
        Ok(())
    }

    /// Stop the scheduler gracefully.
    ///
    /// Cancels the background task and awaits completion. An in-flight
    /// vendor transaction commits or rolls back on its own; cancellation
    /// only takes effect between ticks.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is not running
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping reconcile scheduler");

        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = Duration::from_secs(5);
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|err| SchedulerError::TaskJoinFailed(err.to_string()))?;
        }

        info!("Reconcile scheduler stopped");
        Ok(())
    }

    /// Check if scheduler is running.
    ///
    /// A scheduler is considered running if it has an active task handle that
    /// hasn't finished.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Background reconcile loop
    async fn run_loop(
        service: Arc<ReconcileService>,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Reconcile loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    Self::run_once(&service).await;
                }
            }
        }
    }

    async fn run_once(service: &Arc<ReconcileService>) {
        match service.reconcile_all().await {
            Ok(report) => {
                for vendor in &report.vendors {
                    match (&vendor.summary, &vendor.error) {
                        (Some(summary), _) => info!(
                            vendor = %vendor.vendor_name,
                            created = summary.created,
                            updated = summary.updated,
                            expired = summary.expired,
                            needs_review = summary.needs_review,
                            "vendor reconciled"
                        ),
                        (None, Some(error)) => warn!(
                            vendor = %vendor.vendor_name,
                            %error,
                            "vendor reconciliation failed; will retry next tick"
                        ),
                        (None, None) => {}
                    }
                }
            }
            Err(err) => {
                // Only vendor enumeration can fail here; per-vendor errors
                // are contained in the report.
                error!(error = %err, "Reconciliation run failed to start");
            }
        }
    }
}

/// Ensure scheduler is stopped when dropped
impl Drop for ReconcileScheduler {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() {
            warn!("ReconcileScheduler dropped while running; cancelling");
            self.cancellation_token.cancel();
        }
    }
}
