//! Provider-neutral generation types and the [`GenerationProvider`] trait.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

/// Errors from the generation provider layer.
#[derive(Debug, thiserror::Error)]
pub enum GammaError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The call did not finish within its bound.
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// The provider returned a non-2xx status code.
    #[error("Generation API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx response without the fields we need.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl GammaError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) | Self::Timeout(_) => true,
            Self::ApiError { status, .. } => *status == 429 || *status >= 500,
            Self::MalformedResponse(_) => false,
        }
    }
}

impl From<reqwest::Error> for GammaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// How much content to ask the provider for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Standard,
    /// Fewer cards and condensed text; used when resubmitting a stalled job.
    Compact,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub input_text: String,
    pub mode: GenerationMode,
}

/// Provider view of one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSnapshot {
    /// Raw provider status string.
    pub status: String,
    /// Download URL for the rendered deck, once completed.
    pub export_url: Option<String>,
    pub error_message: Option<String>,
    /// Full response body, kept for job metadata.
    pub raw: serde_json::Value,
}

impl GenerationSnapshot {
    pub fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
            export_url: None,
            error_message: None,
            raw: serde_json::json!({ "status": status }),
        }
    }

    pub fn with_export_url(mut self, url: &str) -> Self {
        self.export_url = Some(url.to_string());
        self.raw["exportUrl"] = serde_json::Value::String(url.to_string());
        self
    }

    pub fn with_error(mut self, message: &str) -> Self {
        self.error_message = Some(message.to_string());
        self.raw["error"] = serde_json::json!({ "message": message });
        self
    }

    /// Extract the fields we act on from a provider response body.
    pub fn from_response(raw: serde_json::Value) -> Result<Self, GammaError> {
        let status = raw
            .get("status")
            .and_then(|s| s.as_str())
            .ok_or_else(|| GammaError::MalformedResponse("missing 'status'".into()))?
            .to_string();

        let export_url = ["exportUrl", "pptxUrl", "fileUrl"]
            .iter()
            .find_map(|key| raw.get(*key).and_then(|v| v.as_str()))
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        let error_message = match raw.get("error") {
            Some(serde_json::Value::String(msg)) => Some(msg.clone()),
            Some(obj) => obj
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string),
            None => None,
        };

        Ok(Self {
            status,
            export_url,
            error_message,
            raw,
        })
    }
}

/// The external generation service as seen by the job pipeline.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Start a generation; returns the provider generation id.
    async fn create_generation(&self, request: &GenerationRequest) -> Result<String, GammaError>;

    /// Current provider view of a generation.
    async fn get_generation(&self, generation_id: &str) -> Result<GenerationSnapshot, GammaError>;

    /// Fetch a finished artifact within `timeout`.
    async fn download_artifact(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, GammaError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn parses_completed_response() {
        let snap = GenerationSnapshot::from_response(json!({
            "generationId": "g1",
            "status": "completed",
            "exportUrl": "https://provider/x.pptx"
        }))
        .unwrap();
        assert_eq!(snap.status, "completed");
        assert_eq!(snap.export_url.as_deref(), Some("https://provider/x.pptx"));
        assert!(snap.error_message.is_none());
    }

    #[test]
    fn parses_error_object_and_string() {
        let obj = GenerationSnapshot::from_response(json!({
            "status": "failed",
            "error": { "message": "quota exceeded" }
        }))
        .unwrap();
        assert_eq!(obj.error_message.as_deref(), Some("quota exceeded"));

        let text = GenerationSnapshot::from_response(json!({
            "status": "failed",
            "error": "bad input"
        }))
        .unwrap();
        assert_eq!(text.error_message.as_deref(), Some("bad input"));
    }

    #[test]
    fn empty_export_url_is_absent() {
        let snap =
            GenerationSnapshot::from_response(json!({ "status": "completed", "exportUrl": "" }))
                .unwrap();
        assert!(snap.export_url.is_none());
    }

    #[test]
    fn missing_status_is_malformed() {
        assert_matches!(
            GenerationSnapshot::from_response(json!({ "id": "g1" })),
            Err(GammaError::MalformedResponse(_))
        );
    }

    #[test]
    fn retryable_classification() {
        assert!(GammaError::Timeout("t".into()).is_retryable());
        assert!(GammaError::ApiError { status: 503, body: String::new() }.is_retryable());
        assert!(!GammaError::ApiError { status: 401, body: String::new() }.is_retryable());
        assert!(!GammaError::MalformedResponse("x".into()).is_retryable());
    }
}
