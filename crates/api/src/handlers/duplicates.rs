//! Handlers for duplicate supplier resolution.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use portal_core::types::DbId;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// The only bulk action accepted by `POST /admin/duplicates`.
pub const RESOLVE_DUPLICATES_ACTION: &str = "resolve_duplicates";

#[derive(Debug, Deserialize)]
pub struct DuplicateActionRequest {
    pub action: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveGroupRequest {
    pub keep_supplier_id: Option<String>,
}

/// GET /api/v1/admin/duplicates
///
/// Dry run: every duplicate group with its recommendation. No mutation.
pub async fn list_duplicates(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let groups = state.duplicates.list_groups().await?;
    Ok(Json(DataResponse { data: groups }))
}

/// POST /api/v1/admin/duplicates
pub async fn run_duplicate_action(
    State(state): State<AppState>,
    Json(body): Json<DuplicateActionRequest>,
) -> AppResult<impl IntoResponse> {
    match body.action.as_deref() {
        Some(RESOLVE_DUPLICATES_ACTION) => {}
        Some(other) => return Err(AppError::BadRequest(format!("Unknown action '{other}'"))),
        None => return Err(AppError::BadRequest("action is required".into())),
    }

    let result = state.duplicates.auto_resolve().await?;
    Ok(Json(DataResponse { data: result }))
}

/// PATCH /api/v1/admin/duplicates
///
/// Approve `keepSupplierId` and reject the rest of its group.
pub async fn resolve_duplicate_group(
    State(state): State<AppState>,
    Json(body): Json<ResolveGroupRequest>,
) -> AppResult<impl IntoResponse> {
    let raw = body
        .keep_supplier_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("keepSupplierId is required".into()))?;
    let keep_id: DbId = raw
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid keepSupplierId '{raw}'")))?;

    let result = state.duplicates.resolve_group(keep_id).await?;
    Ok(Json(DataResponse { data: result }))
}
