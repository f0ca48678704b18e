//! In-process object storage.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::{ObjectStorage, StorageError};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
    upload_failure: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StoredObject>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reject every later upload with a 500 carrying `message`.
    pub fn fail_uploads(&self, message: &str) {
        *self.upload_failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(message.to_string());
    }

    pub fn get(&self, path: &str) -> Option<StoredObject> {
        self.lock().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let failure = self
            .upload_failure
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(body) = failure {
            return Err(StorageError::ApiError { status: 500, body });
        }
        self.lock().insert(
            path.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, StorageError> {
        if !self.lock().contains_key(path) {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(format!("memory://{path}?expires_in={}", ttl.as_secs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn upload_overwrites_and_signs() {
        let storage = MemoryStorage::new();
        storage.upload("a.pptx", vec![1], "x").await.unwrap();
        storage.upload("a.pptx", vec![2, 3], "x").await.unwrap();

        assert_eq!(storage.len(), 1);
        assert_eq!(storage.get("a.pptx").unwrap().bytes, vec![2, 3]);
        assert_eq!(
            storage.signed_url("a.pptx", Duration::from_secs(600)).await.unwrap(),
            "memory://a.pptx?expires_in=600"
        );
    }

    #[tokio::test]
    async fn signing_missing_object_fails() {
        let storage = MemoryStorage::new();
        assert_matches!(
            storage.signed_url("nope", Duration::from_secs(1)).await,
            Err(StorageError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn failing_uploads_store_nothing() {
        let storage = MemoryStorage::new();
        storage.fail_uploads("bucket offline");
        assert_matches!(
            storage.upload("a.pptx", vec![1], "x").await,
            Err(StorageError::ApiError { status: 500, .. })
        );
        assert!(storage.is_empty());
    }
}
