//! Object-safe store seams over the repositories.
//!
//! The application tier is stateless; every correctness-critical exclusion
//! (job claim, invite redemption, per-group resolution) happens inside the
//! store's atomic primitives, never in application locks.

use async_trait::async_trait;
use portal_core::duplicates::{DuplicateCandidate, GroupResolution};
use portal_core::generation::JobMeta;
use portal_core::invite::Redemption;
use portal_core::status::SupplierStatus;
use portal_core::types::{DbId, Timestamp};

use crate::models::invite_code::InviteCode;
use crate::models::job::GenerationJob;
use crate::repositories::{InviteCodeRepo, JobRepo, SupplierRepo};
use crate::DbPool;

/// Durable queue of generation jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(
        &self,
        prompt: &str,
        input_json: &serde_json::Value,
    ) -> Result<GenerationJob, sqlx::Error>;

    async fn find_job(&self, id: DbId) -> Result<Option<GenerationJob>, sqlx::Error>;

    /// Claim the oldest pending job, or `None` if the queue is empty or the
    /// claim lost a race.
    async fn claim_next_pending(&self) -> Result<Option<GenerationJob>, sqlx::Error>;

    /// Persist progress/meta while running.
    ///
    /// Guarded on the job still being running and on `observed` matching its
    /// `updated_at`; `None` means the job left running or another caller wrote
    /// it since it was read.
    async fn update_running(
        &self,
        id: DbId,
        observed: Timestamp,
        progress: i16,
        meta: &JobMeta,
    ) -> Result<Option<GenerationJob>, sqlx::Error>;

    async fn complete_job(
        &self,
        id: DbId,
        file_path: &str,
        meta: &JobMeta,
    ) -> Result<Option<GenerationJob>, sqlx::Error>;

    async fn fail_job(
        &self,
        id: DbId,
        error: &str,
        meta: Option<&JobMeta>,
    ) -> Result<Option<GenerationJob>, sqlx::Error>;
}

/// Supplier records as seen by the duplicate engine.
#[async_trait]
pub trait SupplierStore: Send + Sync {
    async fn list_candidates(
        &self,
        statuses: &[SupplierStatus],
    ) -> Result<Vec<DuplicateCandidate>, sqlx::Error>;

    async fn find_candidate(&self, id: DbId) -> Result<Option<DuplicateCandidate>, sqlx::Error>;

    /// Apply one group's status writes atomically.
    async fn apply_resolution(&self, resolution: &GroupResolution) -> Result<(), sqlx::Error>;
}

/// One-time invite codes.
#[async_trait]
pub trait InviteCodeStore: Send + Sync {
    async fn find_code(&self, code: &str) -> Result<Option<InviteCode>, sqlx::Error>;

    /// Single-shot check-and-set; `false` means a concurrent redemption won.
    async fn record_redemption(
        &self,
        code: &InviteCode,
        redemption: &Redemption,
    ) -> Result<bool, sqlx::Error>;
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

/// Store backed by the Postgres repositories.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn create_job(
        &self,
        prompt: &str,
        input_json: &serde_json::Value,
    ) -> Result<GenerationJob, sqlx::Error> {
        JobRepo::create(&self.pool, prompt, input_json).await
    }

    async fn find_job(&self, id: DbId) -> Result<Option<GenerationJob>, sqlx::Error> {
        JobRepo::find_by_id(&self.pool, id).await
    }

    async fn claim_next_pending(&self) -> Result<Option<GenerationJob>, sqlx::Error> {
        JobRepo::claim_next(&self.pool).await
    }

    async fn update_running(
        &self,
        id: DbId,
        observed: Timestamp,
        progress: i16,
        meta: &JobMeta,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        JobRepo::update_running(&self.pool, id, observed, progress, meta).await
    }

    async fn complete_job(
        &self,
        id: DbId,
        file_path: &str,
        meta: &JobMeta,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        JobRepo::complete(&self.pool, id, file_path, meta).await
    }

    async fn fail_job(
        &self,
        id: DbId,
        error: &str,
        meta: Option<&JobMeta>,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        JobRepo::fail(&self.pool, id, error, meta).await
    }
}

#[async_trait]
impl SupplierStore for PgStore {
    async fn list_candidates(
        &self,
        statuses: &[SupplierStatus],
    ) -> Result<Vec<DuplicateCandidate>, sqlx::Error> {
        SupplierRepo::list_candidates(&self.pool, statuses).await
    }

    async fn find_candidate(&self, id: DbId) -> Result<Option<DuplicateCandidate>, sqlx::Error> {
        SupplierRepo::find_candidate(&self.pool, id).await
    }

    async fn apply_resolution(&self, resolution: &GroupResolution) -> Result<(), sqlx::Error> {
        SupplierRepo::apply_resolution(&self.pool, resolution).await
    }
}

#[async_trait]
impl InviteCodeStore for PgStore {
    async fn find_code(&self, code: &str) -> Result<Option<InviteCode>, sqlx::Error> {
        InviteCodeRepo::find_by_code(&self.pool, code).await
    }

    async fn record_redemption(
        &self,
        code: &InviteCode,
        redemption: &Redemption,
    ) -> Result<bool, sqlx::Error> {
        InviteCodeRepo::record_redemption(&self.pool, code, redemption).await
    }
}
