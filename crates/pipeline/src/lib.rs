//! Generation job pipeline.
//!
//! Jobs move `pending -> running -> {done, failed}`. [`JobWorker`] claims
//! and drives one job per tick, [`StatusSynchronizer`] reconciles a running
//! job with the provider, and [`JobService`] backs the enqueue and
//! status-poll endpoints.

pub mod error;
pub mod prompt;
pub mod service;
pub mod settings;
pub mod sync;
pub mod worker;

pub use error::PipelineError;
pub use service::{JobService, JobStatusView};
pub use settings::PipelineSettings;
pub use sync::StatusSynchronizer;
pub use worker::{JobWorker, TickOutcome};
