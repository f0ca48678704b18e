//! Pipeline thresholds and budgets.

use std::time::Duration;

use portal_core::generation::{
    PollFailureBudget, DEFAULT_PENDING_RETRY_AFTER_SECS, DEFAULT_PENDING_RETRY_BUDGET,
    DEFAULT_POLL_FAILURE_BUDGET, DEFAULT_STALE_WITHOUT_GENERATION_SECS,
    DEFAULT_TRANSIENT_POLL_FAILURE_BUDGET, MAX_PENDING_RETRY_BUDGET,
};

/// Job pipeline settings.
///
/// | Env var                              | Default |
/// |--------------------------------------|---------|
/// | `JOB_STALE_WITHOUT_GENERATION_SECS`  | `120`   |
/// | `JOB_PENDING_RETRY_AFTER_SECS`       | `180`   |
/// | `JOB_PENDING_RETRY_BUDGET`           | `1`     |
/// | `JOB_TRANSIENT_POLL_FAILURE_BUDGET`  | `10`    |
/// | `JOB_POLL_FAILURE_BUDGET`            | `3`     |
/// | `JOB_DOWNLOAD_TIMEOUT_SECS`          | `60`    |
/// | `JOB_SIGNED_URL_TTL_SECS`            | `600`   |
/// | `WORKER_HARD_TIMEOUT_SECS`           | `280`   |
/// | `WORKER_POLL_INTERVAL_SECS`          | `5`     |
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub stale_without_generation: chrono::Duration,
    pub pending_retry_after: chrono::Duration,
    /// Resubmissions allowed while the provider sits in `pending`; at most 2.
    pub pending_retry_budget: u32,
    pub poll_failure_budget: PollFailureBudget,
    pub download_timeout: Duration,
    pub signed_url_ttl: Duration,
    pub worker_hard_timeout: Duration,
    pub worker_poll_interval: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            stale_without_generation: chrono::Duration::seconds(
                DEFAULT_STALE_WITHOUT_GENERATION_SECS,
            ),
            pending_retry_after: chrono::Duration::seconds(DEFAULT_PENDING_RETRY_AFTER_SECS),
            pending_retry_budget: DEFAULT_PENDING_RETRY_BUDGET,
            poll_failure_budget: PollFailureBudget::default(),
            download_timeout: Duration::from_secs(60),
            signed_url_ttl: Duration::from_secs(600),
            worker_hard_timeout: Duration::from_secs(280),
            worker_poll_interval: Duration::from_secs(5),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl PipelineSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            stale_without_generation: chrono::Duration::seconds(env_or(
                "JOB_STALE_WITHOUT_GENERATION_SECS",
                DEFAULT_STALE_WITHOUT_GENERATION_SECS,
            )),
            pending_retry_after: chrono::Duration::seconds(env_or(
                "JOB_PENDING_RETRY_AFTER_SECS",
                DEFAULT_PENDING_RETRY_AFTER_SECS,
            )),
            pending_retry_budget: env_or("JOB_PENDING_RETRY_BUDGET", DEFAULT_PENDING_RETRY_BUDGET)
                .min(MAX_PENDING_RETRY_BUDGET),
            poll_failure_budget: PollFailureBudget {
                transient: env_or(
                    "JOB_TRANSIENT_POLL_FAILURE_BUDGET",
                    DEFAULT_TRANSIENT_POLL_FAILURE_BUDGET,
                ),
                permanent: env_or("JOB_POLL_FAILURE_BUDGET", DEFAULT_POLL_FAILURE_BUDGET),
            },
            download_timeout: Duration::from_secs(env_or(
                "JOB_DOWNLOAD_TIMEOUT_SECS",
                defaults.download_timeout.as_secs(),
            )),
            signed_url_ttl: Duration::from_secs(env_or(
                "JOB_SIGNED_URL_TTL_SECS",
                defaults.signed_url_ttl.as_secs(),
            )),
            worker_hard_timeout: Duration::from_secs(env_or(
                "WORKER_HARD_TIMEOUT_SECS",
                defaults.worker_hard_timeout.as_secs(),
            )),
            worker_poll_interval: Duration::from_secs(env_or(
                "WORKER_POLL_INTERVAL_SECS",
                defaults.worker_poll_interval.as_secs(),
            )),
        }
    }
}
