use std::time::Duration;

use portal_gamma::GammaConfig;
use portal_pipeline::PipelineSettings;
use portal_storage::StorageConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `60`).
    pub request_timeout_secs: u64,
    /// Bearer secret for the worker-tick trigger; open when unset.
    pub cron_secret: Option<String>,
    pub pipeline: PipelineSettings,
    pub gamma: GammaConfig,
    pub storage: StorageConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `60`                       |
    /// | `CRON_SECRET`          | unset                      |
    ///
    /// Pipeline, provider and storage settings read their own variables;
    /// see [`PipelineSettings`], [`GammaConfig`] and [`StorageConfig`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let cron_secret = std::env::var("CRON_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            cron_secret,
            pipeline: PipelineSettings::from_env(),
            gamma: GammaConfig::from_env(),
            storage: StorageConfig::from_env(),
        }
    }

    /// Bound for `POST /generation-jobs/worker-tick`.
    ///
    /// The worker's hard timeout plus one request timeout, leaving room to
    /// claim the job before and record its outcome after the hard timeout.
    pub fn worker_tick_timeout(&self) -> Duration {
        self.pipeline.worker_hard_timeout + Duration::from_secs(self.request_timeout_secs)
    }
}
