use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use portal_core::status::InviteCodeStatus;
use portal_db::models::invite_code::RedeemInviteCode;
use serde::Serialize;

use crate::engine::invites;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemedInviteCode {
    pub code: String,
    pub status: InviteCodeStatus,
    pub used_count: i32,
    pub max_uses: i32,
}

/// POST /api/v1/invite-codes/redeem
pub async fn redeem_invite_code(
    State(state): State<AppState>,
    Json(body): Json<RedeemInviteCode>,
) -> AppResult<impl IntoResponse> {
    let raw = body
        .code
        .ok_or_else(|| AppError::BadRequest("code is required".into()))?;
    let invite = invites::redeem(state.invite_codes.as_ref(), &raw).await?;

    Ok(Json(DataResponse {
        data: RedeemedInviteCode {
            status: invite.status(),
            code: invite.code,
            used_count: invite.used_count,
            max_uses: invite.max_uses,
        },
    }))
}
