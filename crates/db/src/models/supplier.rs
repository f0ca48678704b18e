//! Supplier rows as consumed by the duplicate engine.

use portal_core::duplicates::DuplicateCandidate;
use portal_core::error::CoreError;
use portal_core::status::{StatusId, SupplierStatus};
use portal_core::supplier::SupplierType;
use portal_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A supplier joined with its company profile and owning account.
#[derive(Debug, Clone, FromRow)]
pub struct SupplierCandidateRow {
    pub id: DbId,
    pub user_id: DbId,
    pub supplier_type: String,
    pub status_id: StatusId,
    pub company_name: Option<String>,
    pub has_invite_code: bool,
    pub is_imported: bool,
    pub created_at: Option<Timestamp>,
    pub submitted_at: Option<Timestamp>,
}

impl TryFrom<SupplierCandidateRow> for DuplicateCandidate {
    type Error = CoreError;

    fn try_from(row: SupplierCandidateRow) -> Result<Self, Self::Error> {
        let status = SupplierStatus::from_id(row.status_id).ok_or_else(|| {
            CoreError::Internal(format!("Unknown supplier status id {}", row.status_id))
        })?;
        Ok(DuplicateCandidate {
            id: row.id,
            user_id: row.user_id,
            supplier_type: SupplierType::from_name(&row.supplier_type)?,
            status,
            company_name: row.company_name,
            has_invite_code: row.has_invite_code,
            is_imported: row.is_imported,
            created_at: row.created_at,
            submitted_at: row.submitted_at,
        })
    }
}
