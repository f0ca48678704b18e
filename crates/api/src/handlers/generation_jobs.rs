//! Handlers for the `/generation-jobs` resource.

use axum::extract::{Path, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use portal_core::status::JobStatus;
use portal_core::types::DbId;
use portal_db::models::job::CreateGenerationJob;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueuedJob {
    pub job_id: DbId,
    pub status: JobStatus,
}

/// POST /api/v1/generation-jobs
///
/// Returns 201 with the new job id. The job starts `pending`.
pub async fn enqueue_job(
    State(state): State<AppState>,
    Json(input): Json<CreateGenerationJob>,
) -> AppResult<impl IntoResponse> {
    let job = state.jobs.enqueue(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: EnqueuedJob {
                job_id: job.id,
                status: job.status(),
            },
        }),
    ))
}

/// GET /api/v1/generation-jobs/{id}
///
/// Synchronizes a running job with the provider before answering.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let view = state.jobs.get_job_status(id).await?;
    Ok(Json(DataResponse { data: view }))
}

/// POST /api/v1/generation-jobs/worker-tick
///
/// Claims and drives at most one pending job. Requires
/// `Authorization: Bearer <CRON_SECRET>` when a secret is configured.
pub async fn worker_tick(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    authorize_cron(&headers, state.config.cron_secret.as_deref())?;
    let outcome = state.worker.tick().await;
    Ok(Json(DataResponse { data: outcome }))
}

fn authorize_cron(headers: &HeaderMap, secret: Option<&str>) -> AppResult<()> {
    let Some(secret) = secret else {
        return Ok(());
    };
    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == secret => Ok(()),
        _ => Err(AppError::Unauthorized("Invalid cron secret".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn open_without_secret() {
        assert!(authorize_cron(&HeaderMap::new(), None).is_ok());
    }

    #[test]
    fn secret_must_match() {
        assert!(authorize_cron(&bearer("s3cret"), Some("s3cret")).is_ok());
        assert!(authorize_cron(&bearer("nope"), Some("s3cret")).is_err());
        assert!(authorize_cron(&HeaderMap::new(), Some("s3cret")).is_err());
    }
}
