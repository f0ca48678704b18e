//! Generation job entity models and DTOs.

use portal_core::generation::JobMeta;
use portal_core::status::{JobStatus, StatusId};
use portal_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `generation_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GenerationJob {
    pub id: DbId,
    pub status_id: StatusId,
    pub progress: i16,
    pub prompt: String,
    pub input_json: serde_json::Value,
    pub file_path: Option<String>,
    pub error: Option<String>,
    pub meta: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl GenerationJob {
    /// Decoded status. The `status_id` foreign key guarantees a known id;
    /// an unknown one is treated as failed so nothing drives it further.
    pub fn status(&self) -> JobStatus {
        JobStatus::from_id(self.status_id).unwrap_or(JobStatus::Failed)
    }

    pub fn job_meta(&self) -> JobMeta {
        JobMeta::from_value(&self.meta)
    }
}

/// DTO for `POST /api/v1/generation-jobs`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGenerationJob {
    pub prompt: Option<String>,
    pub input_json: Option<serde_json::Value>,
}
