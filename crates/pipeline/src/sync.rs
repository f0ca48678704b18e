//! Reconciles a running job with the provider's view of its generation.

use std::sync::Arc;

use chrono::Utc;
use portal_core::error::CoreError;
use portal_core::generation::{
    estimate_progress, should_retry_pending, JobMeta, ProviderStatus, DOWNLOAD_PROGRESS_FLOOR,
    STUCK_WITHOUT_GENERATION_ERROR,
};
use portal_core::status::JobStatus;
use portal_core::types::{DbId, Timestamp};
use portal_db::models::job::GenerationJob;
use portal_db::store::JobStore;
use portal_gamma::{GenerationMode, GenerationProvider, GenerationRequest, GenerationSnapshot};
use portal_storage::{job_artifact_path, ObjectStorage, PPTX_CONTENT_TYPE};

use crate::error::PipelineError;
use crate::prompt::compose_input_text;
use crate::settings::PipelineSettings;

const PROVIDER_FAILED_ERROR: &str = "Generation failed at provider";
const MISSING_EXPORT_URL_ERROR: &str = "Generation completed without an export URL";

pub struct StatusSynchronizer {
    jobs: Arc<dyn JobStore>,
    provider: Arc<dyn GenerationProvider>,
    storage: Arc<dyn ObjectStorage>,
    settings: PipelineSettings,
}

impl StatusSynchronizer {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        provider: Arc<dyn GenerationProvider>,
        storage: Arc<dyn ObjectStorage>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            jobs,
            provider,
            storage,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Advance a running job one step from the provider's current status.
    ///
    /// Returns the job as stored afterwards. Jobs that are not running are
    /// returned untouched. Transport and parsing errors, including a failed
    /// artifact download or upload, are returned to the caller, which budgets
    /// them with [`Self::record_poll_failure`]. The stored failure counter is
    /// only cleared once a step has gone through.
    ///
    /// Every write is guarded on the `updated_at` of the job passed in. If a
    /// concurrent caller wrote first, the stored job is returned instead.
    pub async fn sync_running_job(&self, job: GenerationJob) -> Result<GenerationJob, PipelineError> {
        if job.status() != JobStatus::Running {
            return Ok(job);
        }

        let now = Utc::now();
        let mut meta = job.job_meta();

        let Some(generation_id) = meta.gamma.generation_id.clone() else {
            if now - job.updated_at > self.settings.stale_without_generation {
                return self
                    .fail(job.id, STUCK_WITHOUT_GENERATION_ERROR, Some(&meta))
                    .await;
            }
            return Ok(job);
        };

        let snapshot = self.provider.get_generation(&generation_id).await?;
        let status = ProviderStatus::normalize(&snapshot.status);
        tracing::debug!(
            job_id = %job.id,
            generation_id = %generation_id,
            provider_status = %snapshot.status,
            "Synced generation status",
        );

        meta.gamma.last_status = Some(snapshot.status.clone());
        meta.gamma.last_snapshot = Some(snapshot.raw.clone());

        match status {
            ProviderStatus::Failed => {
                let message = snapshot
                    .error_message
                    .as_deref()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or(PROVIDER_FAILED_ERROR);
                meta.clear_poll_failures();
                self.fail(job.id, message, Some(&meta)).await
            }
            ProviderStatus::Completed => self.finish(job, meta, snapshot).await,
            ProviderStatus::Pending => {
                let mut job = job;
                if meta.gamma.queue_pending_since.is_none() {
                    meta.gamma.queue_pending_since = Some(now);
                } else if should_retry_pending(
                    &meta.gamma,
                    now,
                    self.settings.pending_retry_after,
                    self.settings.pending_retry_budget,
                ) {
                    // The retry is spent in a guarded write first; only the
                    // winner of that write calls the provider.
                    meta.gamma.queue_retry_count += 1;
                    let reserved = self
                        .jobs
                        .update_running(job.id, job.updated_at, job.progress, &meta)
                        .await?;
                    let Some(reserved) = reserved else {
                        return self.current(job.id).await;
                    };
                    job = reserved;
                    self.resubmit(&job, &mut meta, now).await;
                }
                let since = meta.gamma.queue_pending_since.unwrap_or(now);
                self.record_progress(&job, meta, &status, now - since).await
            }
            ProviderStatus::InProgress(_) => {
                meta.gamma.queue_pending_since = None;
                self.record_progress(&job, meta, &status, now - job.created_at)
                    .await
            }
        }
    }

    /// Count a failed sync against the job's poll-failure budget.
    ///
    /// Fails the job once the budget for this kind of error is spent;
    /// otherwise stores the counter and leaves the job running.
    pub async fn record_poll_failure(
        &self,
        job_id: DbId,
        error: &PipelineError,
    ) -> Result<GenerationJob, PipelineError> {
        let message = error.to_string();
        if error.is_timeout() {
            tracing::warn!(job_id = %job_id, error = %message, "Provider timed out during job sync");
        } else {
            tracing::warn!(job_id = %job_id, error = %message, "Job sync failed");
        }

        let job = self.current(job_id).await?;
        if job.status() != JobStatus::Running {
            return Ok(job);
        }

        let mut meta = job.job_meta();
        meta.poll_failures += 1;
        meta.last_poll_error = Some(message.clone());

        if self
            .settings
            .poll_failure_budget
            .is_exhausted(meta.poll_failures, &message)
        {
            let reason = format!(
                "Status polling failed {} times: {message}",
                meta.poll_failures
            );
            return self.fail(job_id, &reason, Some(&meta)).await;
        }

        let updated = self
            .jobs
            .update_running(job_id, job.updated_at, job.progress, &meta)
            .await?;
        self.settle(job_id, updated).await
    }

    /// Fail a job that is not yet terminal and return its stored state.
    pub async fn fail(
        &self,
        job_id: DbId,
        message: &str,
        meta: Option<&JobMeta>,
    ) -> Result<GenerationJob, PipelineError> {
        tracing::warn!(job_id = %job_id, error = %message, "Failing generation job");
        let updated = self.jobs.fail_job(job_id, message, meta).await?;
        self.settle(job_id, updated).await
    }

    // ---- private helpers ----

    /// The progress write before the download keeps the stored poll-failure
    /// counter, so a download or upload that keeps failing still exhausts
    /// the budget.
    async fn finish(
        &self,
        job: GenerationJob,
        mut meta: JobMeta,
        snapshot: GenerationSnapshot,
    ) -> Result<GenerationJob, PipelineError> {
        let progress = job.progress.max(DOWNLOAD_PROGRESS_FLOOR);
        let updated = self
            .jobs
            .update_running(job.id, job.updated_at, progress, &meta)
            .await?;
        if updated.is_none() {
            return self.current(job.id).await;
        }

        let Some(url) = snapshot.export_url else {
            return self
                .fail(job.id, MISSING_EXPORT_URL_ERROR, Some(&meta))
                .await;
        };

        let bytes = self
            .provider
            .download_artifact(&url, self.settings.download_timeout)
            .await?;
        let path = job_artifact_path(job.id);
        let size = bytes.len();
        self.storage.upload(&path, bytes, PPTX_CONTENT_TYPE).await?;

        meta.clear_poll_failures();
        let updated = self.jobs.complete_job(job.id, &path, &meta).await?;
        tracing::info!(job_id = %job.id, path = %path, size, "Generation job done");
        self.settle(job.id, updated).await
    }

    /// Resubmit in compact mode. A failed resubmission is recorded in the
    /// metadata and does not fail the job.
    async fn resubmit(&self, job: &GenerationJob, meta: &mut JobMeta, now: Timestamp) {
        let request = GenerationRequest {
            input_text: compose_input_text(&job.prompt, &job.input_json, true),
            mode: GenerationMode::Compact,
        };

        match self.provider.create_generation(&request).await {
            Ok(new_id) => {
                tracing::info!(
                    job_id = %job.id,
                    generation_id = %new_id,
                    attempt = meta.gamma.queue_retry_count,
                    "Resubmitted generation stuck in provider queue",
                );
                if let Some(previous) = meta.gamma.generation_id.replace(new_id) {
                    meta.gamma.previous_generation_ids.push(previous.clone());
                    meta.gamma.previous_generation_id = Some(previous);
                }
                meta.gamma.queue_pending_since = Some(now);
                meta.gamma.retry_error = None;
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "Generation resubmission failed");
                meta.gamma.retry_error = Some(e.to_string());
            }
        }
    }

    async fn record_progress(
        &self,
        job: &GenerationJob,
        mut meta: JobMeta,
        status: &ProviderStatus,
        elapsed: chrono::Duration,
    ) -> Result<GenerationJob, PipelineError> {
        let progress = estimate_progress(job.progress, status, elapsed);
        meta.clear_poll_failures();
        let updated = self
            .jobs
            .update_running(job.id, job.updated_at, progress, &meta)
            .await?;
        self.settle(job.id, updated).await
    }

    /// A guarded write that matched nothing means another caller moved the
    /// job on; report what is stored now.
    async fn settle(
        &self,
        job_id: DbId,
        updated: Option<GenerationJob>,
    ) -> Result<GenerationJob, PipelineError> {
        match updated {
            Some(job) => Ok(job),
            None => self.current(job_id).await,
        }
    }

    async fn current(&self, job_id: DbId) -> Result<GenerationJob, PipelineError> {
        self.jobs
            .find_job(job_id)
            .await?
            .ok_or_else(|| CoreError::not_found("GenerationJob", job_id).into())
    }
}
