//! Route definitions for `/admin/duplicates`.
//!
//! Admin authentication is enforced in front of this service.

use axum::routing::get;
use axum::Router;

use crate::handlers::duplicates;
use crate::state::AppState;

/// Routes mounted at `/admin/duplicates`.
///
/// ```text
/// GET    /    -> list_duplicates
/// POST   /    -> run_duplicate_action
/// PATCH  /    -> resolve_duplicate_group
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/",
        get(duplicates::list_duplicates)
            .post(duplicates::run_duplicate_action)
            .patch(duplicates::resolve_duplicate_group),
    )
}
