//! Single-job-per-tick generation worker.

use std::sync::Arc;

use portal_core::generation::{CLAIMED_PROGRESS, SUBMITTED_PROGRESS};
use portal_core::status::JobStatus;
use portal_core::types::DbId;
use portal_db::models::job::GenerationJob;
use portal_db::store::JobStore;
use portal_gamma::{GenerationMode, GenerationProvider, GenerationRequest};
use serde::Serialize;

use crate::error::PipelineError;
use crate::prompt::compose_input_text;
use crate::sync::StatusSynchronizer;

/// Result of one worker tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickOutcome {
    pub ok: bool,
    pub processed_job_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TickOutcome {
    fn idle() -> Self {
        Self {
            ok: true,
            processed_job_id: None,
            error: None,
        }
    }
}

pub struct JobWorker {
    jobs: Arc<dyn JobStore>,
    provider: Arc<dyn GenerationProvider>,
    synchronizer: Arc<StatusSynchronizer>,
}

impl JobWorker {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        provider: Arc<dyn GenerationProvider>,
        synchronizer: Arc<StatusSynchronizer>,
    ) -> Self {
        Self {
            jobs,
            provider,
            synchronizer,
        }
    }

    /// Claim at most one pending job and drive it.
    ///
    /// A lost claim race counts as an empty queue; the tick never moves on
    /// to another job.
    pub async fn tick(&self) -> TickOutcome {
        match self.jobs.claim_next_pending().await {
            Ok(Some(job)) => {
                tracing::info!(job_id = %job.id, "Generation job claimed");
                self.process_one_job(job).await
            }
            Ok(None) => TickOutcome::idle(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to claim generation job");
                TickOutcome {
                    ok: false,
                    processed_job_id: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Run the generation workflow for a claimed job within the hard
    /// wall-clock budget.
    ///
    /// An error inside the workflow fails the job. Hitting the budget leaves
    /// the job running for the next status poll to pick up.
    pub async fn process_one_job(&self, job: GenerationJob) -> TickOutcome {
        let job_id = job.id;
        let hard_timeout = self.synchronizer.settings().worker_hard_timeout;

        match tokio::time::timeout(hard_timeout, self.drive(job)).await {
            Ok(Ok(job)) if job.status() == JobStatus::Failed => TickOutcome {
                ok: false,
                processed_job_id: Some(job_id),
                error: Some(PipelineError::Terminal(job.error.unwrap_or_default()).to_string()),
            },
            Ok(Ok(_)) => TickOutcome {
                ok: true,
                processed_job_id: Some(job_id),
                error: None,
            },
            Ok(Err(e)) => {
                let message = e.to_string();
                if let Err(fail_err) = self.synchronizer.fail(job_id, &message, None).await {
                    tracing::error!(job_id = %job_id, error = %fail_err, "Failed to record job failure");
                }
                TickOutcome {
                    ok: false,
                    processed_job_id: Some(job_id),
                    error: Some(message),
                }
            }
            Err(_) => {
                tracing::warn!(
                    job_id = %job_id,
                    timeout_secs = hard_timeout.as_secs(),
                    "Worker hit its hard timeout; job left for status polling",
                );
                TickOutcome {
                    ok: true,
                    processed_job_id: Some(job_id),
                    error: None,
                }
            }
        }
    }

    // ---- private helpers ----

    async fn drive(&self, job: GenerationJob) -> Result<GenerationJob, PipelineError> {
        let mut job = self.submit(job).await?;
        let poll_interval = self.synchronizer.settings().worker_poll_interval;

        while job.status() == JobStatus::Running {
            tokio::time::sleep(poll_interval).await;
            job = match self.synchronizer.sync_running_job(job.clone()).await {
                Ok(job) => job,
                Err(e) => self.synchronizer.record_poll_failure(job.id, &e).await?,
            };
        }
        Ok(job)
    }

    async fn submit(&self, job: GenerationJob) -> Result<GenerationJob, PipelineError> {
        let mut meta = job.job_meta();
        let Some(job) = self
            .jobs
            .update_running(job.id, job.updated_at, job.progress.max(CLAIMED_PROGRESS), &meta)
            .await?
        else {
            return Err(PipelineError::Terminal(format!(
                "Job {} changed before submission",
                job.id
            )));
        };

        let request = GenerationRequest {
            input_text: compose_input_text(&job.prompt, &job.input_json, false),
            mode: GenerationMode::Standard,
        };
        let generation_id = self.provider.create_generation(&request).await?;
        tracing::info!(job_id = %job.id, generation_id = %generation_id, "Generation submitted");

        meta.gamma.generation_id = Some(generation_id);
        self.jobs
            .update_running(
                job.id,
                job.updated_at,
                job.progress.max(SUBMITTED_PROGRESS),
                &meta,
            )
            .await?
            .ok_or_else(|| {
                PipelineError::Terminal(format!("Job {} changed during submission", job.id))
            })
    }
}
