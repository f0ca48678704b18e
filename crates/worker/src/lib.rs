//! Standalone generation worker.
//!
//! Drives [`JobWorker::tick`] on a fixed interval as an alternative to the
//! HTTP worker-tick trigger. Every tick keeps the single-job contract.

use std::sync::Arc;
use std::time::Duration;

use portal_pipeline::JobWorker;
use tokio_util::sync::CancellationToken;

/// Default tick period.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(30);

/// Tick period from `WORKER_TICK_INTERVAL_SECS` (default `30`).
pub fn tick_interval_from_env() -> Duration {
    std::env::var("WORKER_TICK_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TICK_INTERVAL)
}

pub struct WorkerLoop {
    worker: Arc<JobWorker>,
    tick_interval: Duration,
}

impl WorkerLoop {
    pub fn new(worker: Arc<JobWorker>, tick_interval: Duration) -> Self {
        Self {
            worker,
            tick_interval,
        }
    }

    /// Run ticks until the cancellation token is triggered.
    ///
    /// A tick in progress is allowed to finish; its own hard timeout
    /// bounds how long shutdown waits.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(
            tick_interval_ms = self.tick_interval.as_millis() as u64,
            "Generation worker started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Generation worker shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let outcome = self.worker.tick().await;
                    match (&outcome.processed_job_id, &outcome.error) {
                        (Some(job_id), None) => {
                            tracing::info!(job_id = %job_id, "Tick processed job");
                        }
                        (job_id, Some(error)) => {
                            tracing::warn!(job_id = ?job_id, error = %error, "Tick finished with error");
                        }
                        (None, None) => tracing::debug!("Tick found no pending job"),
                    }
                }
            }
        }
    }
}
