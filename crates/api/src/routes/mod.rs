pub mod duplicates;
pub mod generation_jobs;
pub mod health;
pub mod invite_codes;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree served under the request timeout.
///
/// Route hierarchy:
///
/// ```text
/// /admin/duplicates                     list (GET), auto-resolve (POST),
///                                       resolve one group (PATCH)
///
/// /generation-jobs                      enqueue (POST)
/// /generation-jobs/{id}                 status poll (GET)
///
/// /invite-codes/redeem                  redeem a one-time code (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/admin/duplicates", duplicates::router())
        .nest("/generation-jobs", generation_jobs::router())
        .nest("/invite-codes", invite_codes::router())
}

/// Build the `/api/v1` routes bounded by the worker tick timeout.
///
/// ```text
/// /generation-jobs/worker-tick          claim and drive one job (POST)
/// ```
pub fn worker_routes() -> Router<AppState> {
    Router::new().nest("/generation-jobs", generation_jobs::worker_router())
}
