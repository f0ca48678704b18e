//! Repository for supplier status reads and resolution writes.

use portal_core::duplicates::{DuplicateCandidate, GroupResolution};
use portal_core::status::{StatusId, SupplierStatus};
use portal_core::types::DbId;
use sqlx::PgPool;

use crate::models::supplier::SupplierCandidateRow;

/// Candidate select joining company profile and account provenance.
const CANDIDATE_SELECT: &str = "\
    SELECT s.id, s.user_id, s.supplier_type, s.status_id, cp.company_name, \
           (a.invite_code_id IS NOT NULL) AS has_invite_code, \
           COALESCE(a.is_imported, FALSE) AS is_imported, \
           s.created_at, s.submitted_at \
    FROM suppliers s \
    LEFT JOIN company_profiles cp ON cp.supplier_id = s.id \
    LEFT JOIN accounts a ON a.id = s.user_id";

pub struct SupplierRepo;

impl SupplierRepo {
    /// All candidates whose status is in `statuses`.
    pub async fn list_candidates(
        pool: &PgPool,
        statuses: &[SupplierStatus],
    ) -> Result<Vec<DuplicateCandidate>, sqlx::Error> {
        let ids: Vec<StatusId> = statuses.iter().map(|s| s.id()).collect();
        let query = format!("{CANDIDATE_SELECT} WHERE s.status_id = ANY($1)");
        let rows = sqlx::query_as::<_, SupplierCandidateRow>(&query)
            .bind(&ids)
            .fetch_all(pool)
            .await?;
        rows.into_iter().map(to_candidate).collect()
    }

    pub async fn find_candidate(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<DuplicateCandidate>, sqlx::Error> {
        let query = format!("{CANDIDATE_SELECT} WHERE s.id = $1");
        let row = sqlx::query_as::<_, SupplierCandidateRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        row.map(to_candidate).transpose()
    }

    /// Apply one group's status writes in a single transaction.
    ///
    /// The transaction holds an advisory lock keyed by the normalized name,
    /// so concurrent resolutions of the same company serialize and the later
    /// one's writes win.
    pub async fn apply_resolution(
        pool: &PgPool,
        resolution: &GroupResolution,
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&resolution.normalized_name)
            .execute(&mut *tx)
            .await?;

        if resolution.approve_keep {
            sqlx::query("UPDATE suppliers SET status_id = $2, updated_at = NOW() WHERE id = $1")
                .bind(resolution.keep_id)
                .bind(SupplierStatus::Approved.id())
                .execute(&mut *tx)
                .await?;
        }

        if !resolution.reject_ids.is_empty() {
            sqlx::query(
                "UPDATE suppliers SET status_id = $2, updated_at = NOW() WHERE id = ANY($1)",
            )
            .bind(&resolution.reject_ids)
            .bind(SupplierStatus::Rejected.id())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }
}

fn to_candidate(row: SupplierCandidateRow) -> Result<DuplicateCandidate, sqlx::Error> {
    DuplicateCandidate::try_from(row).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}
