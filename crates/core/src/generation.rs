//! Generation job domain rules (deck generation via the external provider).
//!
//! Job metadata shape, provider status normalization, progress mapping,
//! and the poll-failure / pending-retry budgets. No I/O.

use std::sync::LazyLock;

use chrono::Duration;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// A running job with no provider generation id is failed after this long.
pub const DEFAULT_STALE_WITHOUT_GENERATION_SECS: i64 = 120;

/// Provider-side `pending` longer than this triggers a resubmission.
pub const DEFAULT_PENDING_RETRY_AFTER_SECS: i64 = 180;

/// Resubmissions allowed per job.
pub const DEFAULT_PENDING_RETRY_BUDGET: u32 = 1;

/// Upper bound on the configurable resubmission budget.
pub const MAX_PENDING_RETRY_BUDGET: u32 = 2;

/// Poll failures tolerated when the error looks transient.
pub const DEFAULT_TRANSIENT_POLL_FAILURE_BUDGET: u32 = 10;

/// Poll failures tolerated otherwise.
pub const DEFAULT_POLL_FAILURE_BUDGET: u32 = 3;

/// Progress floor once the provider reports completion.
pub const DOWNLOAD_PROGRESS_FLOOR: i16 = 90;

/// Ceiling for any progress reported before the job is `done`.
pub const MAX_IN_FLIGHT_PROGRESS: i16 = 95;

/// Error written when a job never obtained a provider generation id.
pub const STUCK_WITHOUT_GENERATION_ERROR: &str =
    "Generation job stuck before generation id assignment";

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Extensible per-job metadata persisted as JSONB.
///
/// Unknown keys are kept in `extra` so older writers do not lose data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMeta {
    #[serde(default)]
    pub gamma: GammaMeta,
    #[serde(default)]
    pub poll_failures: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_poll_error: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Provider-specific state for one job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_id: Option<String>,
    /// When the provider was first seen reporting `pending` for the current
    /// generation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_pending_since: Option<Timestamp>,
    #[serde(default)]
    pub queue_retry_count: u32,
    /// The generation id replaced by the most recent resubmission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_generation_id: Option<String>,
    /// Every replaced generation id, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previous_generation_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_status: Option<String>,
    /// Raw provider payload from the most recent poll.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_snapshot: Option<serde_json::Value>,
}

impl JobMeta {
    /// Decode stored metadata, falling back to defaults on malformed input.
    pub fn from_value(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }

    /// Forget earlier poll failures after a sync step went through.
    pub fn clear_poll_failures(&mut self) {
        self.poll_failures = 0;
        self.last_poll_error = None;
    }
}

// ---------------------------------------------------------------------------
// Provider status
// ---------------------------------------------------------------------------

/// Provider status vocabulary normalized to what the synchronizer acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    Pending,
    Completed,
    Failed,
    /// Anything else, carrying the raw status for progress mapping.
    InProgress(String),
}

impl ProviderStatus {
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "queued" | "waiting" => Self::Pending,
            "completed" | "complete" | "succeeded" | "success" | "done" => Self::Completed,
            "failed" | "failure" | "error" | "errored" | "cancelled" | "canceled" => Self::Failed,
            other => Self::InProgress(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress reported right after a job is claimed.
pub const CLAIMED_PROGRESS: i16 = 5;

/// Progress once the provider accepted a generation request.
pub const SUBMITTED_PROGRESS: i16 = 15;

/// Map provider status and elapsed time to a progress percentage.
///
/// Never returns less than `current` and never reaches 100: the curve
/// approaches [`MAX_IN_FLIGHT_PROGRESS`] asymptotically. Provider `pending`
/// stays below 30 since no work has started yet.
pub fn estimate_progress(current: i16, status: &ProviderStatus, elapsed: Duration) -> i16 {
    let secs = elapsed.num_seconds().max(0) as f64;
    let estimated = match status {
        ProviderStatus::Pending => SUBMITTED_PROGRESS as f64 + 15.0 * (1.0 - (-secs / 120.0).exp()),
        ProviderStatus::Completed => DOWNLOAD_PROGRESS_FLOOR as f64,
        ProviderStatus::Failed => current as f64,
        ProviderStatus::InProgress(_) => {
            30.0 + (MAX_IN_FLIGHT_PROGRESS as f64 - 31.0) * (1.0 - (-secs / 90.0).exp())
        }
    };
    let estimated = (estimated.floor() as i16).min(MAX_IN_FLIGHT_PROGRESS - 1);
    current.max(estimated).min(MAX_IN_FLIGHT_PROGRESS)
}

// ---------------------------------------------------------------------------
// Budgets
// ---------------------------------------------------------------------------

static TRANSIENT_ERROR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)timeout|timed out|aborted|network|econnreset|econnrefused|enotfound|etimedout|socket hang up|temporarily unavailable|connection (reset|refused|closed)",
    )
    .expect("valid regex")
});

/// Whether an error message looks like provider flakiness rather than a
/// structural problem.
pub fn is_transient_error(message: &str) -> bool {
    TRANSIENT_ERROR_RE.is_match(message)
}

/// Poll-failure budgets for the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollFailureBudget {
    pub transient: u32,
    pub permanent: u32,
}

impl Default for PollFailureBudget {
    fn default() -> Self {
        Self {
            transient: DEFAULT_TRANSIENT_POLL_FAILURE_BUDGET,
            permanent: DEFAULT_POLL_FAILURE_BUDGET,
        }
    }
}

impl PollFailureBudget {
    /// Whether `failures` (already incremented) exhausts the budget for an
    /// error described by `message`.
    pub fn is_exhausted(&self, failures: u32, message: &str) -> bool {
        let limit = if is_transient_error(message) {
            self.transient
        } else {
            self.permanent
        };
        failures >= limit
    }
}

/// Whether a job stuck in provider `pending` should be resubmitted.
pub fn should_retry_pending(
    meta: &GammaMeta,
    now: Timestamp,
    retry_after: Duration,
    budget: u32,
) -> bool {
    let budget = budget.min(MAX_PENDING_RETRY_BUDGET);
    match meta.queue_pending_since {
        Some(since) => now - since > retry_after && meta.queue_retry_count < budget,
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    // -- Metadata ------------------------------------------------------------

    #[test]
    fn meta_uses_camel_case_and_keeps_unknown_keys() {
        let meta = JobMeta::from_value(&json!({
            "gamma": { "generationId": "g-1", "queueRetryCount": 1 },
            "pollFailures": 2,
            "source": "admin-panel"
        }));
        assert_eq!(meta.gamma.generation_id.as_deref(), Some("g-1"));
        assert_eq!(meta.gamma.queue_retry_count, 1);
        assert_eq!(meta.poll_failures, 2);

        let back = meta.to_value();
        assert_eq!(back["source"], "admin-panel");
        assert_eq!(back["gamma"]["generationId"], "g-1");
    }

    #[test]
    fn malformed_meta_falls_back_to_default() {
        assert_eq!(JobMeta::from_value(&json!("nonsense")), JobMeta::default());
        assert_eq!(JobMeta::from_value(&json!(null)), JobMeta::default());
    }

    #[test]
    fn clearing_poll_failures_keeps_provider_state() {
        let mut meta = JobMeta::from_value(&json!({
            "gamma": { "generationId": "g-1" },
            "pollFailures": 2,
            "lastPollError": "boom"
        }));
        meta.clear_poll_failures();
        assert_eq!(meta.poll_failures, 0);
        assert_eq!(meta.last_poll_error, None);
        assert_eq!(meta.gamma.generation_id.as_deref(), Some("g-1"));
        assert!(meta.to_value().get("lastPollError").is_none());
    }

    // -- Provider status -----------------------------------------------------

    #[test]
    fn provider_status_normalization() {
        assert_eq!(ProviderStatus::normalize("PENDING"), ProviderStatus::Pending);
        assert_eq!(ProviderStatus::normalize("completed"), ProviderStatus::Completed);
        assert_eq!(ProviderStatus::normalize("failed"), ProviderStatus::Failed);
        assert_eq!(
            ProviderStatus::normalize("processing"),
            ProviderStatus::InProgress("processing".into())
        );
    }

    // -- Progress ------------------------------------------------------------

    #[test]
    fn progress_never_regresses() {
        let p = estimate_progress(80, &ProviderStatus::Pending, Duration::seconds(1));
        assert_eq!(p, 80);
    }

    #[test]
    fn progress_grows_with_time_and_stays_below_done() {
        let status = ProviderStatus::InProgress("processing".into());
        let early = estimate_progress(0, &status, Duration::seconds(10));
        let later = estimate_progress(0, &status, Duration::seconds(120));
        let much_later = estimate_progress(0, &status, Duration::hours(5));
        assert!(early < later);
        assert!(later <= much_later);
        assert!(much_later < 100);
    }

    #[test]
    fn completed_maps_to_download_floor() {
        assert_eq!(
            estimate_progress(40, &ProviderStatus::Completed, Duration::zero()),
            DOWNLOAD_PROGRESS_FLOOR
        );
    }

    // -- Budgets -------------------------------------------------------------

    #[test]
    fn transient_error_classification() {
        assert!(is_transient_error("request Timeout after 20s"));
        assert!(is_transient_error("The operation was aborted"));
        assert!(is_transient_error("getaddrinfo ENOTFOUND api.example"));
        assert!(is_transient_error("connect ECONNREFUSED 127.0.0.1:443"));
        assert!(is_transient_error("network unreachable"));
        assert!(!is_transient_error("401 Unauthorized"));
        assert!(!is_transient_error("invalid json at line 1"));
    }

    #[test]
    fn transient_errors_get_the_larger_budget() {
        let budget = PollFailureBudget::default();
        assert!(!budget.is_exhausted(3, "timeout"));
        assert!(budget.is_exhausted(10, "timeout"));
        assert!(budget.is_exhausted(3, "bad gateway payload"));
        assert!(!budget.is_exhausted(2, "bad gateway payload"));
    }

    #[test]
    fn pending_retry_requires_elapsed_threshold_and_budget() {
        let now = Utc::now();
        let mut meta = GammaMeta {
            queue_pending_since: Some(now - Duration::seconds(200)),
            ..Default::default()
        };
        let after = Duration::seconds(180);

        assert!(should_retry_pending(&meta, now, after, 1));

        meta.queue_retry_count = 1;
        assert!(!should_retry_pending(&meta, now, after, 1));

        meta.queue_retry_count = 0;
        meta.queue_pending_since = Some(now - Duration::seconds(30));
        assert!(!should_retry_pending(&meta, now, after, 1));

        meta.queue_pending_since = None;
        assert!(!should_retry_pending(&meta, now, after, 1));
    }

    #[test]
    fn pending_retry_budget_is_capped() {
        let now = Utc::now();
        let meta = GammaMeta {
            queue_pending_since: Some(now - Duration::seconds(999)),
            queue_retry_count: 2,
            ..Default::default()
        };
        assert!(!should_retry_pending(&meta, now, Duration::seconds(180), 50));
    }
}
