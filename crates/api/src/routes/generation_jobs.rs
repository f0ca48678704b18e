//! Route definitions for the `/generation-jobs` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::generation_jobs;
use crate::state::AppState;

/// Client-facing routes mounted at `/generation-jobs`.
///
/// ```text
/// POST   /              -> enqueue_job
/// GET    /{id}          -> get_job_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(generation_jobs::enqueue_job))
        .route("/{id}", get(generation_jobs::get_job_status))
}

/// The worker trigger, also mounted at `/generation-jobs`.
///
/// A tick can drive one job for the worker's whole hard timeout, so this
/// route is kept apart from the request timeout of [`router`].
///
/// ```text
/// POST   /worker-tick   -> worker_tick
/// ```
pub fn worker_router() -> Router<AppState> {
    Router::new().route("/worker-tick", post(generation_jobs::worker_tick))
}
