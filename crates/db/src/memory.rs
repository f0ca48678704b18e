//! In-memory store with the same check-and-set semantics as Postgres.
//!
//! Backs the pipeline and HTTP tests and local runs without a database.
//! Every guarded write takes the mutex once, so the compare and the swap are
//! atomic exactly like a conditional `UPDATE`.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use portal_core::duplicates::{DuplicateCandidate, GroupResolution};
use portal_core::generation::JobMeta;
use portal_core::invite::Redemption;
use portal_core::status::{InviteCodeStatus, JobStatus, StatusId, SupplierStatus};
use portal_core::types::{DbId, Timestamp};
use uuid::Uuid;

use crate::models::invite_code::InviteCode;
use crate::models::job::GenerationJob;
use crate::store::{InviteCodeStore, JobStore, SupplierStore};

/// Runs between a claim's candidate read and its swap.
type ClaimHook = Box<dyn FnOnce(&MemoryStore, DbId) + Send>;

#[derive(Default)]
pub struct MemoryStore {
    jobs: Mutex<Vec<GenerationJob>>,
    suppliers: Mutex<Vec<DuplicateCandidate>>,
    invite_codes: Mutex<Vec<InviteCode>>,
    before_claim_swap: Mutex<Option<ClaimHook>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Move `updated_at` forward, never onto the value a guard may hold.
fn touch(job: &mut GenerationJob) {
    job.updated_at = Utc::now().max(job.updated_at + chrono::Duration::microseconds(1));
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Seeding and inspection ----------------------------------------------

    pub fn insert_job(&self, job: GenerationJob) {
        lock(&self.jobs).push(job);
    }

    pub fn job(&self, id: DbId) -> Option<GenerationJob> {
        lock(&self.jobs).iter().find(|j| j.id == id).cloned()
    }

    pub fn insert_candidate(&self, candidate: DuplicateCandidate) {
        lock(&self.suppliers).push(candidate);
    }

    pub fn candidate(&self, id: DbId) -> Option<DuplicateCandidate> {
        lock(&self.suppliers).iter().find(|c| c.id == id).cloned()
    }

    /// Remove a supplier, as if it were deleted between two reads.
    pub fn remove_candidate(&self, id: DbId) {
        lock(&self.suppliers).retain(|c| c.id != id);
    }

    pub fn insert_invite_code(&self, code: &str, max_uses: i32) -> InviteCode {
        let now = Utc::now();
        let row = InviteCode {
            id: Uuid::now_v7(),
            code: code.to_string(),
            status_id: InviteCodeStatus::Active.id(),
            used_count: 0,
            max_uses,
            created_at: now,
            updated_at: now,
        };
        lock(&self.invite_codes).push(row.clone());
        row
    }

    pub fn invite_code(&self, code: &str) -> Option<InviteCode> {
        lock(&self.invite_codes)
            .iter()
            .find(|c| c.code == code)
            .cloned()
    }

    /// Run `hook` once, after the next claim has picked its candidate and
    /// before it swaps the status. Lets tests interleave a competing worker.
    pub fn before_next_claim_swap(&self, hook: impl FnOnce(&MemoryStore, DbId) + Send + 'static) {
        *lock(&self.before_claim_swap) = Some(Box::new(hook));
    }

    /// Conditional status flip mirroring [`crate::cas::compare_and_swap`].
    pub fn compare_and_swap_job_status(
        &self,
        id: DbId,
        expected: JobStatus,
        new: JobStatus,
    ) -> bool {
        let mut jobs = lock(&self.jobs);
        match jobs
            .iter_mut()
            .find(|j| j.id == id && j.status_id == expected.id())
        {
            Some(job) => {
                job.status_id = new.id();
                touch(job);
                true
            }
            None => false,
        }
    }

    /// Apply `f` to the job iff its status is one of `allowed`.
    fn update_job_if(
        &self,
        id: DbId,
        allowed: &[StatusId],
        f: impl FnOnce(&mut GenerationJob),
    ) -> Option<GenerationJob> {
        let mut jobs = lock(&self.jobs);
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id && allowed.contains(&j.status_id))?;
        f(job);
        touch(job);
        Some(job.clone())
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn create_job(
        &self,
        prompt: &str,
        input_json: &serde_json::Value,
    ) -> Result<GenerationJob, sqlx::Error> {
        let now = Utc::now();
        let job = GenerationJob {
            id: Uuid::now_v7(),
            status_id: JobStatus::Pending.id(),
            progress: 0,
            prompt: prompt.to_string(),
            input_json: input_json.clone(),
            file_path: None,
            error: None,
            meta: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        };
        self.insert_job(job.clone());
        Ok(job)
    }

    async fn find_job(&self, id: DbId) -> Result<Option<GenerationJob>, sqlx::Error> {
        Ok(self.job(id))
    }

    async fn claim_next_pending(&self) -> Result<Option<GenerationJob>, sqlx::Error> {
        let candidate = lock(&self.jobs)
            .iter()
            .filter(|j| j.status_id == JobStatus::Pending.id())
            .min_by_key(|j| j.created_at)
            .map(|j| j.id);

        let Some(id) = candidate else {
            return Ok(None);
        };
        let hook = lock(&self.before_claim_swap).take();
        if let Some(hook) = hook {
            hook(self, id);
        }
        if !self.compare_and_swap_job_status(id, JobStatus::Pending, JobStatus::Running) {
            return Ok(None);
        }
        Ok(self.job(id))
    }

    async fn update_running(
        &self,
        id: DbId,
        observed: Timestamp,
        progress: i16,
        meta: &JobMeta,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        let mut jobs = lock(&self.jobs);
        let Some(job) = jobs.iter_mut().find(|j| {
            j.id == id && j.status_id == JobStatus::Running.id() && j.updated_at == observed
        }) else {
            return Ok(None);
        };
        job.progress = progress;
        job.meta = meta.to_value();
        touch(job);
        Ok(Some(job.clone()))
    }

    async fn complete_job(
        &self,
        id: DbId,
        file_path: &str,
        meta: &JobMeta,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        Ok(self.update_job_if(id, &[JobStatus::Running.id()], |job| {
            job.status_id = JobStatus::Done.id();
            job.progress = 100;
            job.file_path = Some(file_path.to_string());
            job.error = None;
            job.meta = meta.to_value();
        }))
    }

    async fn fail_job(
        &self,
        id: DbId,
        error: &str,
        meta: Option<&JobMeta>,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        let open = [JobStatus::Pending.id(), JobStatus::Running.id()];
        Ok(self.update_job_if(id, &open, |job| {
            job.status_id = JobStatus::Failed.id();
            job.error = Some(error.to_string());
            if let Some(meta) = meta {
                job.meta = meta.to_value();
            }
        }))
    }
}

#[async_trait]
impl SupplierStore for MemoryStore {
    async fn list_candidates(
        &self,
        statuses: &[SupplierStatus],
    ) -> Result<Vec<DuplicateCandidate>, sqlx::Error> {
        Ok(lock(&self.suppliers)
            .iter()
            .filter(|c| statuses.contains(&c.status))
            .cloned()
            .collect())
    }

    async fn find_candidate(&self, id: DbId) -> Result<Option<DuplicateCandidate>, sqlx::Error> {
        Ok(self.candidate(id))
    }

    async fn apply_resolution(&self, resolution: &GroupResolution) -> Result<(), sqlx::Error> {
        let mut suppliers = lock(&self.suppliers);
        for supplier in suppliers.iter_mut() {
            if resolution.approve_keep && supplier.id == resolution.keep_id {
                supplier.status = SupplierStatus::Approved;
            } else if resolution.reject_ids.contains(&supplier.id) {
                supplier.status = SupplierStatus::Rejected;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl InviteCodeStore for MemoryStore {
    async fn find_code(&self, code: &str) -> Result<Option<InviteCode>, sqlx::Error> {
        Ok(self.invite_code(code))
    }

    async fn record_redemption(
        &self,
        code: &InviteCode,
        redemption: &Redemption,
    ) -> Result<bool, sqlx::Error> {
        let mut codes = lock(&self.invite_codes);
        let Some(row) = codes.iter_mut().find(|c| {
            c.id == code.id
                && c.used_count == redemption.observed_count
                && c.status_id == InviteCodeStatus::Active.id()
        }) else {
            return Ok(false);
        };

        row.used_count = redemption.new_count;
        if redemption.exhausts {
            row.status_id = InviteCodeStatus::Exhausted.id();
        }
        row.updated_at = Utc::now();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::supplier::SupplierType;

    fn pending_job(prompt: &str, age_secs: i64) -> GenerationJob {
        let created = Utc::now() - chrono::Duration::seconds(age_secs);
        GenerationJob {
            id: Uuid::now_v7(),
            status_id: JobStatus::Pending.id(),
            progress: 0,
            prompt: prompt.into(),
            input_json: serde_json::json!({}),
            file_path: None,
            error: None,
            meta: serde_json::json!({}),
            created_at: created,
            updated_at: created,
        }
    }

    // -- Claim ---------------------------------------------------------------

    #[tokio::test]
    async fn claims_oldest_pending_first() {
        let store = MemoryStore::new();
        let newer = pending_job("newer", 10);
        let older = pending_job("older", 60);
        store.insert_job(newer);
        store.insert_job(older.clone());

        let claimed = store.claim_next_pending().await.unwrap().unwrap();
        assert_eq!(claimed.id, older.id);
        assert_eq!(claimed.status(), JobStatus::Running);
    }

    #[tokio::test]
    async fn empty_queue_claims_nothing() {
        let store = MemoryStore::new();
        assert!(store.claim_next_pending().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn claim_that_loses_the_swap_returns_none_without_retrying() {
        let store = MemoryStore::new();
        let contested = pending_job("contested", 60);
        let other = pending_job("other", 10);
        store.insert_job(contested.clone());
        store.insert_job(other.clone());

        // A competing worker flips the candidate between read and swap.
        store.before_next_claim_swap(|store, id| {
            assert!(store.compare_and_swap_job_status(id, JobStatus::Pending, JobStatus::Running));
        });

        assert!(store.claim_next_pending().await.unwrap().is_none());
        assert_eq!(store.job(contested.id).unwrap().status(), JobStatus::Running);
        assert_eq!(store.job(other.id).unwrap().status(), JobStatus::Pending);

        let next = store.claim_next_pending().await.unwrap().unwrap();
        assert_eq!(next.id, other.id);
    }

    #[test]
    fn second_swap_on_same_expected_state_loses() {
        let store = MemoryStore::new();
        let job = pending_job("race", 5);
        store.insert_job(job.clone());

        assert!(store.compare_and_swap_job_status(job.id, JobStatus::Pending, JobStatus::Running));
        assert!(!store.compare_and_swap_job_status(job.id, JobStatus::Pending, JobStatus::Running));
    }

    // -- Terminal immutability -----------------------------------------------

    #[tokio::test]
    async fn terminal_jobs_reject_further_writes() {
        let store = MemoryStore::new();
        let job = pending_job("p", 5);
        store.insert_job(job.clone());
        store.claim_next_pending().await.unwrap();

        let failed = store.fail_job(job.id, "boom", None).await.unwrap().unwrap();
        assert_eq!(failed.status(), JobStatus::Failed);

        let meta = JobMeta::default();
        assert!(store.complete_job(job.id, "x.pptx", &meta).await.unwrap().is_none());
        let stored = store.job(job.id).unwrap();
        assert!(store
            .update_running(job.id, stored.updated_at, 50, &meta)
            .await
            .unwrap()
            .is_none());
        assert!(store.fail_job(job.id, "again", None).await.unwrap().is_none());
        assert_eq!(store.job(job.id).unwrap().error.as_deref(), Some("boom"));
    }

    // -- Progress writes -----------------------------------------------------

    #[tokio::test]
    async fn progress_write_from_a_stale_read_is_rejected() {
        let store = MemoryStore::new();
        store.insert_job(pending_job("p", 5));
        let claimed = store.claim_next_pending().await.unwrap().unwrap();

        let mut meta = JobMeta::default();
        meta.gamma.generation_id = Some("g1".into());
        let first = store
            .update_running(claimed.id, claimed.updated_at, 20, &meta)
            .await
            .unwrap()
            .unwrap();
        assert!(first.updated_at > claimed.updated_at);

        meta.gamma.generation_id = Some("g2".into());
        assert!(store
            .update_running(claimed.id, claimed.updated_at, 30, &meta)
            .await
            .unwrap()
            .is_none());

        let stored = store.job(claimed.id).unwrap();
        assert_eq!(stored.progress, 20);
        assert_eq!(stored.job_meta().gamma.generation_id.as_deref(), Some("g1"));
    }

    // -- Suppliers -----------------------------------------------------------

    #[tokio::test]
    async fn resolution_touches_only_listed_ids() {
        let store = MemoryStore::new();
        let make = || DuplicateCandidate {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            supplier_type: SupplierType::Basic,
            status: SupplierStatus::Submitted,
            company_name: Some("Acme".into()),
            has_invite_code: false,
            is_imported: true,
            created_at: None,
            submitted_at: None,
        };
        let (keep, reject, bystander) = (make(), make(), make());
        for c in [&keep, &reject, &bystander] {
            store.insert_candidate(c.clone());
        }

        store
            .apply_resolution(&GroupResolution {
                normalized_name: "acme".into(),
                keep_id: keep.id,
                approve_keep: true,
                reject_ids: vec![reject.id],
            })
            .await
            .unwrap();

        assert_eq!(store.candidate(keep.id).unwrap().status, SupplierStatus::Approved);
        assert_eq!(store.candidate(reject.id).unwrap().status, SupplierStatus::Rejected);
        assert_eq!(store.candidate(bystander.id).unwrap().status, SupplierStatus::Submitted);
    }

    // -- Invite codes --------------------------------------------------------

    #[tokio::test]
    async fn stale_redemption_loses_the_swap() {
        let store = MemoryStore::new();
        let code = store.insert_invite_code("WELCOME", 1);
        let redemption = Redemption {
            observed_count: 0,
            new_count: 1,
            exhausts: true,
        };

        assert!(store.record_redemption(&code, &redemption).await.unwrap());
        assert!(!store.record_redemption(&code, &redemption).await.unwrap());

        let row = store.invite_code("WELCOME").unwrap();
        assert_eq!(row.used_count, 1);
        assert_eq!(row.status(), InviteCodeStatus::Exhausted);
    }
}
