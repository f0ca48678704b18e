//! Repository for the `generation_jobs` table.
//!
//! Writes after the claim are guarded on the current status so a terminal
//! job (`done` / `failed`) is never modified again. Progress writes are also
//! guarded on the `updated_at` the caller read and always move it forward,
//! so it acts as a row version.

use portal_core::generation::JobMeta;
use portal_core::status::{JobStatus, StatusId};
use portal_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::cas::{compare_and_swap, CasTarget};
use crate::models::job::GenerationJob;

/// Column list for `generation_jobs` queries.
const COLUMNS: &str = "\
    id, status_id, progress, prompt, input_json, file_path, error, meta, \
    created_at, updated_at";

/// Terminal statuses: done, failed.
const TERMINAL_STATUSES: [StatusId; 2] = [JobStatus::Done as StatusId, JobStatus::Failed as StatusId];

/// Provides persistence operations for generation jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new pending job.
    pub async fn create(
        pool: &PgPool,
        prompt: &str,
        input_json: &serde_json::Value,
    ) -> Result<GenerationJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO generation_jobs (status_id, progress, prompt, input_json, meta) \
             VALUES ($1, 0, $2, $3, '{{}}'::jsonb) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(JobStatus::Pending.id())
            .bind(prompt)
            .bind(input_json)
            .fetch_one(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<GenerationJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generation_jobs WHERE id = $1");
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Claim the oldest pending job.
    ///
    /// Reads the oldest pending id, then flips it to running with a single
    /// compare-and-swap. Losing the swap to another worker yields `None`;
    /// the caller treats that as an empty queue for this tick.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<GenerationJob>, sqlx::Error> {
        let candidate: Option<DbId> = sqlx::query_scalar(
            "SELECT id FROM generation_jobs \
             WHERE status_id = $1 \
             ORDER BY created_at ASC, id ASC \
             LIMIT 1",
        )
        .bind(JobStatus::Pending.id())
        .fetch_optional(pool)
        .await?;

        let Some(id) = candidate else {
            return Ok(None);
        };

        let won = compare_and_swap(
            pool,
            CasTarget::JobStatus,
            id,
            JobStatus::Pending.id(),
            JobStatus::Running.id(),
        )
        .await?;

        if !won {
            return Ok(None);
        }
        Self::find_by_id(pool, id).await
    }

    /// Persist progress and metadata for a job that is still running and
    /// unchanged since `observed`.
    ///
    /// Returns `None` if the job is no longer running or was written by
    /// another caller in the meantime.
    pub async fn update_running(
        pool: &PgPool,
        id: DbId,
        observed: Timestamp,
        progress: i16,
        meta: &JobMeta,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        let query = format!(
            "UPDATE generation_jobs \
             SET progress = $2, meta = $3, \
                 updated_at = GREATEST(NOW(), updated_at + INTERVAL '1 microsecond') \
             WHERE id = $1 AND status_id = $4 AND updated_at = $5 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(id)
            .bind(progress)
            .bind(meta.to_value())
            .bind(JobStatus::Running.id())
            .bind(observed)
            .fetch_optional(pool)
            .await
    }

    /// Mark a running job as done with its stored artifact path.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        file_path: &str,
        meta: &JobMeta,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        let query = format!(
            "UPDATE generation_jobs \
             SET status_id = $2, progress = 100, file_path = $3, meta = $4, \
                 error = NULL, updated_at = NOW() \
             WHERE id = $1 AND status_id = $5 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(id)
            .bind(JobStatus::Done.id())
            .bind(file_path)
            .bind(meta.to_value())
            .bind(JobStatus::Running.id())
            .fetch_optional(pool)
            .await
    }

    /// Mark a non-terminal job as failed. No automatic retry is performed.
    pub async fn fail(
        pool: &PgPool,
        id: DbId,
        error: &str,
        meta: Option<&JobMeta>,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        let query = format!(
            "UPDATE generation_jobs \
             SET status_id = $2, error = $3, meta = COALESCE($4, meta), updated_at = NOW() \
             WHERE id = $1 AND status_id NOT IN ($5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(id)
            .bind(JobStatus::Failed.id())
            .bind(error)
            .bind(meta.map(JobMeta::to_value))
            .bind(TERMINAL_STATUSES[0])
            .bind(TERMINAL_STATUSES[1])
            .fetch_optional(pool)
            .await
    }
}
