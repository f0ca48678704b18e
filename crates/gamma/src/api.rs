//! REST client for the Gamma generation API.
//!
//! Wraps generation submission, status retrieval and export download
//! using [`reqwest`].

use std::time::Duration;

use async_trait::async_trait;

use crate::provider::{
    GammaError, GenerationMode, GenerationProvider, GenerationRequest, GenerationSnapshot,
};

/// Default provider base URL.
pub const DEFAULT_API_URL: &str = "https://public-api.gamma.app/v0.2";

/// Default per-call bound for submit and status requests.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

/// Connection settings for the Gamma API.
///
/// | Env var                      | Default                               |
/// |------------------------------|---------------------------------------|
/// | `GAMMA_API_URL`              | `https://public-api.gamma.app/v0.2`   |
/// | `GAMMA_API_KEY`              | (empty)                               |
/// | `GAMMA_REQUEST_TIMEOUT_SECS` | `20`                                  |
#[derive(Debug, Clone)]
pub struct GammaConfig {
    pub api_url: String,
    pub api_key: String,
    pub request_timeout: Duration,
}

impl Default for GammaConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl GammaConfig {
    pub fn from_env() -> Self {
        let request_timeout_secs: u64 = std::env::var("GAMMA_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Self {
            api_url: std::env::var("GAMMA_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: std::env::var("GAMMA_API_KEY").unwrap_or_default(),
            request_timeout: Duration::from_secs(request_timeout_secs),
        }
    }
}

/// HTTP client for the Gamma generation API.
pub struct GammaApi {
    client: reqwest::Client,
    config: GammaConfig,
}

impl GammaApi {
    pub fn new(config: GammaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: GammaConfig) -> Self {
        Self { client, config }
    }

    fn generations_url(&self) -> String {
        format!("{}/generations", self.config.api_url)
    }

    async fn fetch_generation(&self, generation_id: &str) -> Result<GenerationSnapshot, GammaError> {
        let response = self
            .client
            .get(format!("{}/{}", self.generations_url(), generation_id))
            .header("X-API-KEY", &self.config.api_key)
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        let raw: serde_json::Value = Self::parse_response(response).await?;
        GenerationSnapshot::from_response(raw)
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`GammaError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, GammaError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {e}>"));
            return Err(GammaError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GammaError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl GenerationProvider for GammaApi {
    /// `POST /generations`; the response carries the generation id.
    async fn create_generation(&self, request: &GenerationRequest) -> Result<String, GammaError> {
        let body = serde_json::json!({
            "inputText": request.input_text,
            "textMode": "generate",
            "format": "presentation",
            "exportAs": "pptx",
            "textOptions": { "amount": match request.mode {
                GenerationMode::Standard => "medium",
                GenerationMode::Compact => "brief",
            }},
            "mode": request.mode,
        });

        let response = self
            .client
            .post(self.generations_url())
            .header("X-API-KEY", &self.config.api_key)
            .timeout(self.config.request_timeout)
            .json(&body)
            .send()
            .await?;

        let raw: serde_json::Value = Self::parse_response(response).await?;
        raw.get("generationId")
            .or_else(|| raw.get("id"))
            .and_then(|v| v.as_str())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| GammaError::MalformedResponse("missing 'generationId'".into()))
    }

    /// `GET /generations/{id}`, retried once on a transient failure.
    async fn get_generation(&self, generation_id: &str) -> Result<GenerationSnapshot, GammaError> {
        match self.fetch_generation(generation_id).await {
            Err(e) if e.is_retryable() => {
                tracing::warn!(generation_id, error = %e, "Status read failed, retrying once");
                self.fetch_generation(generation_id).await
            }
            other => other,
        }
    }

    async fn download_artifact(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, GammaError> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_public_api() {
        let config = GammaConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(20));
    }

    #[test]
    fn generations_url_joins_base() {
        let api = GammaApi::new(GammaConfig {
            api_url: "http://localhost:9999/v0.2".into(),
            ..GammaConfig::default()
        });
        assert_eq!(api.generations_url(), "http://localhost:9999/v0.2/generations");
    }
}
