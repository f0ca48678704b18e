//! Supabase Storage HTTP backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{ObjectStorage, StorageError};

pub const DEFAULT_STORAGE_URL: &str = "http://localhost:54321";
pub const DEFAULT_BUCKET: &str = "supplier-decks";

/// Storage connection settings.
///
/// | Env var               | Default                  |
/// |-----------------------|--------------------------|
/// | `STORAGE_URL`         | `http://localhost:54321` |
/// | `STORAGE_SERVICE_KEY` | (empty)                  |
/// | `STORAGE_BUCKET`      | `supplier-decks`         |
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub base_url: String,
    pub service_key: String,
    pub bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_STORAGE_URL.to_string(),
            service_key: String::new(),
            bucket: DEFAULT_BUCKET.to_string(),
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("STORAGE_URL")
                .unwrap_or_else(|_| DEFAULT_STORAGE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            service_key: std::env::var("STORAGE_SERVICE_KEY").unwrap_or_default(),
            bucket: std::env::var("STORAGE_BUCKET").unwrap_or_else(|_| DEFAULT_BUCKET.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignResponse {
    signed_url: String,
}

pub struct SupabaseStorage {
    client: reqwest::Client,
    config: StorageConfig,
}

impl SupabaseStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: StorageConfig) -> Self {
        Self { client, config }
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.config.base_url,
            self.config.bucket,
            path.trim_start_matches('/')
        )
    }

    fn sign_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.config.base_url,
            self.config.bucket,
            path.trim_start_matches('/')
        )
    }

    /// The sign endpoint returns a path relative to `/storage/v1`.
    fn absolute_signed_url(&self, signed: &str) -> String {
        if signed.starts_with("http://") || signed.starts_with("https://") {
            signed.to_string()
        } else {
            format!(
                "{}/storage/v1/{}",
                self.config.base_url,
                signed.trim_start_matches('/')
            )
        }
    }

    async fn ensure_success(
        path: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, StorageError> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {e}>"));
            return Err(StorageError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let size = bytes.len();
        let response = self
            .client
            .post(self.object_url(path))
            .bearer_auth(&self.config.service_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        Self::ensure_success(path, response).await?;

        tracing::debug!(path, size, "Uploaded object");
        Ok(())
    }

    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, StorageError> {
        let response = self
            .client
            .post(self.sign_url(path))
            .bearer_auth(&self.config.service_key)
            .json(&serde_json::json!({ "expiresIn": ttl.as_secs() }))
            .send()
            .await?;
        let response = Self::ensure_success(path, response).await?;
        let body: SignResponse = response
            .json()
            .await
            .map_err(|e| StorageError::MalformedResponse(e.to_string()))?;

        Ok(self.absolute_signed_url(&body.signed_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> SupabaseStorage {
        SupabaseStorage::new(StorageConfig {
            base_url: "http://storage.local".into(),
            service_key: "key".into(),
            bucket: "decks".into(),
        })
    }

    #[test]
    fn object_and_sign_urls() {
        let s = storage();
        assert_eq!(
            s.object_url("generation-jobs/a.pptx"),
            "http://storage.local/storage/v1/object/decks/generation-jobs/a.pptx"
        );
        assert_eq!(
            s.sign_url("/a.pptx"),
            "http://storage.local/storage/v1/object/sign/decks/a.pptx"
        );
    }

    #[test]
    fn relative_signed_url_is_made_absolute() {
        let s = storage();
        assert_eq!(
            s.absolute_signed_url("/object/sign/decks/a.pptx?token=t"),
            "http://storage.local/storage/v1/object/sign/decks/a.pptx?token=t"
        );
        assert_eq!(s.absolute_signed_url("https://cdn/x"), "https://cdn/x");
    }
}
