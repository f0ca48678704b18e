//! One-time invite code redemption.

use portal_core::error::CoreError;
use portal_core::invite::{normalize_code, plan_redemption};
use portal_db::models::invite_code::InviteCode;
use portal_db::store::InviteCodeStore;

use crate::error::{AppError, AppResult};

/// Redeem `raw_code` once.
///
/// A single check-and-set against the observed `used_count`; losing it to a
/// concurrent redemption is a `Conflict`, never retried.
pub async fn redeem(store: &dyn InviteCodeStore, raw_code: &str) -> AppResult<InviteCode> {
    let code = normalize_code(raw_code);
    if code.is_empty() {
        return Err(AppError::BadRequest("code is required".into()));
    }

    let invite = store
        .find_code(&code)
        .await?
        .ok_or_else(|| CoreError::not_found("InviteCode", &code))?;

    let redemption = plan_redemption(invite.status(), invite.used_count, invite.max_uses)?;
    if !store.record_redemption(&invite, &redemption).await? {
        return Err(CoreError::Conflict("Invite code was redeemed concurrently".into()).into());
    }

    tracing::info!(
        invite_code_id = %invite.id,
        used_count = redemption.new_count,
        exhausted = redemption.exhausts,
        "Invite code redeemed",
    );

    store
        .find_code(&code)
        .await?
        .ok_or_else(|| CoreError::not_found("InviteCode", &code).into())
}
