use axum::routing::post;
use axum::Router;

use crate::handlers::invite_codes;
use crate::state::AppState;

/// Routes mounted at `/invite-codes`.
pub fn router() -> Router<AppState> {
    Router::new().route("/redeem", post(invite_codes::redeem_invite_code))
}
