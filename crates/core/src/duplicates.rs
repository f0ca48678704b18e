//! Duplicate supplier detection and resolution policy.
//!
//! Suppliers are grouped by normalized company name. For every group of two
//! or more records a single keeper is recommended by provenance priority
//! (invited account > user-filled > imported), or the group is flagged for
//! manual admin review. No database access -- pure domain logic.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use crate::error::CoreError;
use crate::status::SupplierStatus;
use crate::supplier::SupplierType;
use crate::types::{DbId, Timestamp};

/// Synthetic account email pattern used by the directory bulk import.
///
/// Only consulted when backfilling the explicit `is_imported` account flag;
/// the decision policy itself reads the flag.
static IMPORT_BOT_EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^directory-import-\d+@example\.com$").expect("valid regex")
});

/// Whether `email` belongs to a bulk-import bot account.
pub fn is_import_bot_email(email: &str) -> bool {
    IMPORT_BOT_EMAIL_RE.is_match(email.trim())
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A supplier record joined with its company name and account provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCandidate {
    pub id: DbId,
    pub user_id: DbId,
    pub supplier_type: SupplierType,
    pub status: SupplierStatus,
    pub company_name: Option<String>,
    pub has_invite_code: bool,
    pub is_imported: bool,
    pub created_at: Option<Timestamp>,
    pub submitted_at: Option<Timestamp>,
}

impl DuplicateCandidate {
    /// `submitted_at`, else `created_at`, else the epoch.
    pub fn recency_key(&self) -> Timestamp {
        self.submitted_at
            .or(self.created_at)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn normalized_name(&self) -> String {
        self.company_name
            .as_deref()
            .map(normalize_company_name)
            .unwrap_or_default()
    }
}

/// Why a group got (or did not get) a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewReason {
    InviteCodePriority,
    MultipleInviteCodeEntries,
    UserFilledPriority,
    MultipleUserFilledEntries,
    ImportedOldestKept,
}

impl ReviewReason {
    /// Reasons that carry no recommendation and need an admin.
    pub fn needs_manual_review(self) -> bool {
        matches!(
            self,
            Self::MultipleInviteCodeEntries | Self::MultipleUserFilledEntries
        )
    }
}

/// Outcome of [`decide`] for a single group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub recommended_keep_id: Option<DbId>,
    pub reason: ReviewReason,
}

/// Records sharing one normalized company name. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    pub normalized_name: String,
    pub members: Vec<DuplicateCandidate>,
    pub recommended_keep_id: Option<DbId>,
    pub review_reason: ReviewReason,
}

impl DuplicateGroup {
    pub fn member_ids(&self) -> Vec<DbId> {
        self.members.iter().map(|m| m.id).collect()
    }

    pub fn contains(&self, id: DbId) -> bool {
        self.members.iter().any(|m| m.id == id)
    }
}

/// Display order of groups by normalized name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOrder {
    Ascending,
    Descending,
}

// ---------------------------------------------------------------------------
// Normalization and grouping
// ---------------------------------------------------------------------------

/// Lowercase and collapse whitespace runs to a single space (trimmed).
pub fn normalize_company_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Group candidates by normalized company name.
///
/// Records whose name normalizes to the empty string are never grouped.
/// Only names with two or more members produce a group. Members are ordered
/// oldest first (ties broken by id) so repeated calls are identical.
pub fn group_duplicates(
    candidates: &[DuplicateCandidate],
    order: GroupOrder,
) -> Vec<DuplicateGroup> {
    let mut by_name: BTreeMap<String, Vec<DuplicateCandidate>> = BTreeMap::new();
    for candidate in candidates {
        let key = candidate.normalized_name();
        if key.is_empty() {
            continue;
        }
        by_name.entry(key).or_default().push(candidate.clone());
    }

    let mut groups: Vec<DuplicateGroup> = by_name
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(normalized_name, mut members)| {
            members.sort_by_key(|m| (m.recency_key(), m.id));
            let decision = decide(&members);
            DuplicateGroup {
                normalized_name,
                members,
                recommended_keep_id: decision.recommended_keep_id,
                review_reason: decision.reason,
            }
        })
        .collect();

    if order == GroupOrder::Descending {
        groups.reverse();
    }
    groups
}

// ---------------------------------------------------------------------------
// Decision policy
// ---------------------------------------------------------------------------

/// Pick the member to keep. Each branch is terminal:
///
/// 1. exactly one invite holder -> keep it
/// 2. several invite holders -> manual review
/// 3. exactly one user-filled member -> keep it
/// 4. several user-filled members -> manual review
/// 5. all imported -> keep the oldest by [`DuplicateCandidate::recency_key`]
pub fn decide(members: &[DuplicateCandidate]) -> Decision {
    let invited: Vec<&DuplicateCandidate> = members.iter().filter(|m| m.has_invite_code).collect();
    match invited.as_slice() {
        [only] => {
            return Decision {
                recommended_keep_id: Some(only.id),
                reason: ReviewReason::InviteCodePriority,
            }
        }
        [_, _, ..] => {
            return Decision {
                recommended_keep_id: None,
                reason: ReviewReason::MultipleInviteCodeEntries,
            }
        }
        [] => {}
    }

    let user_filled: Vec<&DuplicateCandidate> = members.iter().filter(|m| !m.is_imported).collect();
    match user_filled.as_slice() {
        [only] => {
            return Decision {
                recommended_keep_id: Some(only.id),
                reason: ReviewReason::UserFilledPriority,
            }
        }
        [_, _, ..] => {
            return Decision {
                recommended_keep_id: None,
                reason: ReviewReason::MultipleUserFilledEntries,
            }
        }
        [] => {}
    }

    Decision {
        recommended_keep_id: members
            .iter()
            .min_by_key(|m| (m.recency_key(), m.id))
            .map(|m| m.id),
        reason: ReviewReason::ImportedOldestKept,
    }
}

// ---------------------------------------------------------------------------
// Resolution planning
// ---------------------------------------------------------------------------

/// Status writes for one group, applied atomically by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupResolution {
    pub normalized_name: String,
    pub keep_id: DbId,
    /// Single-group apply also promotes the keeper to `approved`.
    pub approve_keep: bool,
    pub reject_ids: Vec<DbId>,
}

/// A group the bulk resolver left for an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualReviewEntry {
    pub normalized_name: String,
    pub reason: ReviewReason,
    pub supplier_ids: Vec<DbId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoResolutionPlan {
    pub resolutions: Vec<GroupResolution>,
    pub manual_review: Vec<ManualReviewEntry>,
}

/// Split groups into automatic resolutions and manual-review entries.
pub fn plan_auto_resolution(groups: &[DuplicateGroup]) -> AutoResolutionPlan {
    let mut plan = AutoResolutionPlan::default();
    for group in groups {
        match group.recommended_keep_id {
            Some(keep_id) => plan.resolutions.push(GroupResolution {
                normalized_name: group.normalized_name.clone(),
                keep_id,
                approve_keep: false,
                reject_ids: group
                    .members
                    .iter()
                    .map(|m| m.id)
                    .filter(|id| *id != keep_id)
                    .collect(),
            }),
            None => plan.manual_review.push(ManualReviewEntry {
                normalized_name: group.normalized_name.clone(),
                reason: group.review_reason,
                supplier_ids: group.member_ids(),
            }),
        }
    }
    plan
}

/// Plan an explicit admin choice: approve `keep`, reject the rest of its group.
///
/// Fails with `NotFound` when `keep` has no group (blank name, or no other
/// record shares it) and with `Validation` when the group computed for its
/// name does not contain it.
pub fn plan_group_resolution(
    groups: &[DuplicateGroup],
    keep: &DuplicateCandidate,
) -> Result<GroupResolution, CoreError> {
    let key = keep.normalized_name();
    if key.is_empty() {
        return Err(CoreError::not_found("DuplicateGroup", keep.id));
    }

    let group = groups
        .iter()
        .find(|g| g.normalized_name == key)
        .ok_or_else(|| CoreError::not_found("DuplicateGroup", keep.id))?;

    if !group.contains(keep.id) {
        return Err(CoreError::Validation(format!(
            "Supplier {} is not a member of duplicate group '{key}'",
            keep.id
        )));
    }

    Ok(GroupResolution {
        normalized_name: key,
        keep_id: keep.id,
        approve_keep: true,
        reject_ids: group
            .members
            .iter()
            .map(|m| m.id)
            .filter(|id| *id != keep.id)
            .collect(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
