//! Enqueue and status-poll operations behind the generation job endpoints.

use std::sync::Arc;

use portal_core::error::CoreError;
use portal_core::status::JobStatus;
use portal_core::supplier::{SupplierForm, SUPPLIER_TYPE_KEY};
use portal_core::types::DbId;
use portal_db::models::job::{CreateGenerationJob, GenerationJob};
use portal_db::store::JobStore;
use portal_storage::ObjectStorage;
use serde::Serialize;

use crate::error::PipelineError;
use crate::sync::StatusSynchronizer;

/// Client-facing job status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusView {
    pub id: DbId,
    pub status: JobStatus,
    pub progress: i16,
    pub error: Option<String>,
    /// Freshly signed for `done` jobs.
    pub download_url: Option<String>,
}

pub struct JobService {
    jobs: Arc<dyn JobStore>,
    storage: Arc<dyn ObjectStorage>,
    synchronizer: Arc<StatusSynchronizer>,
}

impl JobService {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        storage: Arc<dyn ObjectStorage>,
        synchronizer: Arc<StatusSynchronizer>,
    ) -> Self {
        Self {
            jobs,
            storage,
            synchronizer,
        }
    }

    /// Insert a new pending job.
    ///
    /// `inputJson` must be an object. Objects tagged with `supplierType`
    /// are validated as supplier forms.
    pub async fn enqueue(&self, input: CreateGenerationJob) -> Result<GenerationJob, PipelineError> {
        let prompt = input
            .prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| CoreError::Validation("prompt is required".into()))?;

        let input_json = input
            .input_json
            .unwrap_or_else(|| serde_json::json!({}));
        if !input_json.is_object() {
            return Err(CoreError::Validation("inputJson must be an object".into()).into());
        }
        if input_json.get(SUPPLIER_TYPE_KEY).is_some() {
            SupplierForm::parse(&input_json)?;
        }

        let job = self.jobs.create_job(prompt, &input_json).await?;
        tracing::info!(job_id = %job.id, "Generation job enqueued");
        Ok(job)
    }

    /// Current job state, synchronizing with the provider first when the
    /// job is running.
    ///
    /// Sync failures are budgeted, never surfaced: an existing job always
    /// yields its best-known state. Terminal jobs are read-only here.
    pub async fn get_job_status(&self, id: DbId) -> Result<JobStatusView, PipelineError> {
        let job = self
            .jobs
            .find_job(id)
            .await?
            .ok_or_else(|| CoreError::not_found("GenerationJob", id))?;

        let job = if job.status() == JobStatus::Running {
            self.sync_or_budget(job).await
        } else {
            job
        };

        let download_url = match (job.status(), job.file_path.as_deref()) {
            (JobStatus::Done, Some(path)) => {
                let ttl = self.synchronizer.settings().signed_url_ttl;
                match self.storage.signed_url(path, ttl).await {
                    Ok(url) => Some(url),
                    Err(e) => {
                        tracing::error!(job_id = %job.id, error = %e, "Failed to sign download URL");
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(JobStatusView {
            id: job.id,
            status: job.status(),
            progress: job.progress,
            error: job.error,
            download_url,
        })
    }

    async fn sync_or_budget(&self, job: GenerationJob) -> GenerationJob {
        let err = match self.synchronizer.sync_running_job(job.clone()).await {
            Ok(synced) => return synced,
            Err(e) => e,
        };
        match self.synchronizer.record_poll_failure(job.id, &err).await {
            Ok(current) => current,
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Failed to record poll failure");
                job
            }
        }
    }
}
