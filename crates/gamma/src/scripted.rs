//! Scripted provider for exercising the job pipeline without the network.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::provider::{GammaError, GenerationProvider, GenerationRequest, GenerationSnapshot};

/// One scripted answer to a status read.
#[derive(Debug, Clone)]
pub enum ScriptedStatus {
    Snapshot(GenerationSnapshot),
    Timeout,
    Failure(String),
}

#[derive(Default)]
struct Script {
    next_ids: VecDeque<String>,
    create_failure: Option<String>,
    statuses: HashMap<String, VecDeque<ScriptedStatus>>,
    artifacts: HashMap<String, Vec<u8>>,
    slow_artifacts: HashSet<String>,
    created: Vec<GenerationRequest>,
    status_reads: usize,
}

/// Replays canned responses. The last scripted status of a generation
/// repeats once its queue drains.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<Script>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue the id returned by the next `create_generation`.
    pub fn push_generation_id(&self, id: &str) {
        self.lock().next_ids.push_back(id.to_string());
    }

    pub fn fail_create(&self, message: &str) {
        self.lock().create_failure = Some(message.to_string());
    }

    pub fn push_status(&self, generation_id: &str, snapshot: GenerationSnapshot) {
        self.push(generation_id, ScriptedStatus::Snapshot(snapshot));
    }

    pub fn push(&self, generation_id: &str, status: ScriptedStatus) {
        self.lock()
            .statuses
            .entry(generation_id.to_string())
            .or_default()
            .push_back(status);
    }

    pub fn add_artifact(&self, url: &str, bytes: &[u8]) {
        self.lock().artifacts.insert(url.to_string(), bytes.to_vec());
    }

    /// Make every download of `url` time out.
    pub fn time_out_download(&self, url: &str) {
        self.lock().slow_artifacts.insert(url.to_string());
    }

    /// Requests received by `create_generation`, in order.
    pub fn created_requests(&self) -> Vec<GenerationRequest> {
        self.lock().created.clone()
    }

    pub fn status_reads(&self) -> usize {
        self.lock().status_reads
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    async fn create_generation(&self, request: &GenerationRequest) -> Result<String, GammaError> {
        let mut script = self.lock();
        if let Some(message) = script.create_failure.clone() {
            return Err(GammaError::ApiError {
                status: 500,
                body: message,
            });
        }
        script.created.push(request.clone());
        script.next_ids.pop_front().ok_or_else(|| {
            GammaError::MalformedResponse("no scripted generation id".into())
        })
    }

    async fn get_generation(&self, generation_id: &str) -> Result<GenerationSnapshot, GammaError> {
        let mut script = self.lock();
        script.status_reads += 1;
        let queue = script
            .statuses
            .get_mut(generation_id)
            .ok_or_else(|| GammaError::ApiError {
                status: 404,
                body: format!("unknown generation {generation_id}"),
            })?;

        let next = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };

        match next {
            Some(ScriptedStatus::Snapshot(snapshot)) => Ok(snapshot),
            Some(ScriptedStatus::Timeout) => Err(GammaError::Timeout("scripted timeout".into())),
            Some(ScriptedStatus::Failure(message)) => Err(GammaError::ApiError {
                status: 500,
                body: message,
            }),
            None => Err(GammaError::MalformedResponse("empty script".into())),
        }
    }

    async fn download_artifact(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, GammaError> {
        let script = self.lock();
        if script.slow_artifacts.contains(url) {
            return Err(GammaError::Timeout(format!(
                "download of {url} timed out after {}s",
                timeout.as_secs()
            )));
        }
        script
            .artifacts
            .get(url)
            .cloned()
            .ok_or_else(|| GammaError::ApiError {
                status: 404,
                body: format!("no artifact at {url}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GenerationMode;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn last_status_repeats() {
        let provider = ScriptedProvider::new();
        provider.push_status("g1", GenerationSnapshot::new("pending"));
        provider.push_status("g1", GenerationSnapshot::new("completed"));

        assert_eq!(provider.get_generation("g1").await.unwrap().status, "pending");
        assert_eq!(provider.get_generation("g1").await.unwrap().status, "completed");
        assert_eq!(provider.get_generation("g1").await.unwrap().status, "completed");
        assert_eq!(provider.status_reads(), 3);
    }

    #[tokio::test]
    async fn records_created_requests() {
        let provider = ScriptedProvider::new();
        provider.push_generation_id("g1");
        let request = GenerationRequest {
            input_text: "deck".into(),
            mode: GenerationMode::Compact,
        };
        assert_eq!(provider.create_generation(&request).await.unwrap(), "g1");
        assert_eq!(provider.created_requests(), vec![request]);
    }

    #[tokio::test]
    async fn unknown_generation_is_not_found() {
        let provider = ScriptedProvider::new();
        assert_matches!(
            provider.get_generation("missing").await,
            Err(GammaError::ApiError { status: 404, .. })
        );
    }

    #[tokio::test]
    async fn slow_download_times_out() {
        let provider = ScriptedProvider::new();
        provider.add_artifact("https://provider/x.pptx", b"deck");
        provider.time_out_download("https://provider/x.pptx");

        let result = provider
            .download_artifact("https://provider/x.pptx", Duration::from_secs(60))
            .await;
        assert_matches!(result, Err(ref e) if e.is_timeout());
    }
}
