//! Object storage for generated supplier decks.
//!
//! [`ObjectStorage`] is implemented by [`SupabaseStorage`] (HTTP storage
//! API with signed download URLs) and [`MemoryStorage`] for tests.

use std::time::Duration;

use async_trait::async_trait;

pub mod memory;
pub mod supabase;

pub use memory::MemoryStorage;
pub use supabase::{StorageConfig, SupabaseStorage};

/// Content type used for exported decks.
pub const PPTX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Storage API error ({status}): {body}")]
    ApiError { status: u16, body: String },

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Malformed storage response: {0}")]
    MalformedResponse(String),
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Write `bytes` at `path`, replacing any existing object.
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    /// Time-limited download URL for an existing object.
    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, StorageError>;
}

/// Storage key for a job's exported deck.
pub fn job_artifact_path(job_id: impl std::fmt::Display) -> String {
    format!("generation-jobs/{job_id}.pptx")
}
