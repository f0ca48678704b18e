//! Duplicate supplier resolution.
//!
//! Groups are recomputed from the store on every call; nothing about a
//! group is persisted. Each group's status writes are applied by the store
//! in one transaction serialized per company name.

use std::sync::Arc;

use portal_core::duplicates::{
    group_duplicates, plan_auto_resolution, plan_group_resolution, DuplicateGroup, GroupOrder,
    ManualReviewEntry,
};
use portal_core::error::CoreError;
use portal_core::status::{LISTED_SUPPLIER_STATUSES, RESOLVABLE_SUPPLIER_STATUSES};
use portal_core::types::DbId;
use portal_db::store::SupplierStore;
use serde::Serialize;

use crate::error::AppResult;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoResolveResult {
    pub rejected_ids: Vec<DbId>,
    pub manual_review: Vec<ManualReviewEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResolveResult {
    pub approved_id: DbId,
    pub rejected_ids: Vec<DbId>,
}

pub struct ResolutionExecutor {
    suppliers: Arc<dyn SupplierStore>,
}

impl ResolutionExecutor {
    pub fn new(suppliers: Arc<dyn SupplierStore>) -> Self {
        Self { suppliers }
    }

    /// All duplicate groups with recommendations, in reverse alphabetical
    /// order of normalized name.
    /// Read-only.
    pub async fn list_groups(&self) -> AppResult<Vec<DuplicateGroup>> {
        let candidates = self
            .suppliers
            .list_candidates(&LISTED_SUPPLIER_STATUSES)
            .await?;
        Ok(group_duplicates(&candidates, GroupOrder::Descending))
    }

    /// Reject every non-recommended member of each group that has a
    /// recommendation. Groups needing an admin are reported, not touched.
    pub async fn auto_resolve(&self) -> AppResult<AutoResolveResult> {
        let groups = self.resolvable_groups().await?;
        let plan = plan_auto_resolution(&groups);

        let mut rejected_ids = Vec::new();
        for resolution in &plan.resolutions {
            if resolution.reject_ids.is_empty() {
                continue;
            }
            self.suppliers.apply_resolution(resolution).await?;
            tracing::info!(
                group = %resolution.normalized_name,
                keep_id = %resolution.keep_id,
                rejected = resolution.reject_ids.len(),
                "Duplicate group auto-resolved",
            );
            rejected_ids.extend(resolution.reject_ids.iter().copied());
        }

        tracing::info!(
            rejected = rejected_ids.len(),
            manual_review = plan.manual_review.len(),
            "Duplicate auto-resolution finished",
        );
        Ok(AutoResolveResult {
            rejected_ids,
            manual_review: plan.manual_review,
        })
    }

    /// Approve `keep_id` and reject the other members of its group.
    pub async fn resolve_group(&self, keep_id: DbId) -> AppResult<GroupResolveResult> {
        let keep = self
            .suppliers
            .find_candidate(keep_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Supplier", keep_id))?;

        let groups = self.resolvable_groups().await?;
        let resolution = plan_group_resolution(&groups, &keep)?;
        self.suppliers.apply_resolution(&resolution).await?;

        tracing::info!(
            group = %resolution.normalized_name,
            supplier_id = %keep_id,
            rejected = resolution.reject_ids.len(),
            "Duplicate group resolved by admin",
        );
        Ok(GroupResolveResult {
            approved_id: resolution.keep_id,
            rejected_ids: resolution.reject_ids,
        })
    }

    async fn resolvable_groups(&self) -> AppResult<Vec<DuplicateGroup>> {
        let candidates = self
            .suppliers
            .list_candidates(&RESOLVABLE_SUPPLIER_STATUSES)
            .await?;
        Ok(group_duplicates(&candidates, GroupOrder::Ascending))
    }
}
