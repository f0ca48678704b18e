//! Invite code entity model.

use portal_core::status::{InviteCodeStatus, StatusId};
use portal_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `invite_codes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InviteCode {
    pub id: DbId,
    pub code: String,
    pub status_id: StatusId,
    pub used_count: i32,
    pub max_uses: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl InviteCode {
    /// Unknown ids are treated as revoked.
    pub fn status(&self) -> InviteCodeStatus {
        InviteCodeStatus::from_id(self.status_id).unwrap_or(InviteCodeStatus::Revoked)
    }
}

/// DTO for `POST /api/v1/invite-codes/redeem`.
#[derive(Debug, Deserialize)]
pub struct RedeemInviteCode {
    pub code: Option<String>,
}
