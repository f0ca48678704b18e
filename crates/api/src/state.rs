use std::sync::Arc;

use portal_db::store::{InviteCodeStore, SupplierStore};
use portal_pipeline::{JobService, JobWorker};

use crate::config::ServerConfig;
use crate::engine::duplicates::ResolutionExecutor;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database pool, absent when running on in-memory stores.
    pub pool: Option<portal_db::DbPool>,
    pub config: Arc<ServerConfig>,
    pub duplicates: Arc<ResolutionExecutor>,
    pub invite_codes: Arc<dyn InviteCodeStore>,
    pub jobs: Arc<JobService>,
    pub worker: Arc<JobWorker>,
}

impl AppState {
    pub fn new(
        pool: Option<portal_db::DbPool>,
        config: ServerConfig,
        suppliers: Arc<dyn SupplierStore>,
        invite_codes: Arc<dyn InviteCodeStore>,
        jobs: Arc<JobService>,
        worker: Arc<JobWorker>,
    ) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            duplicates: Arc::new(ResolutionExecutor::new(suppliers)),
            invite_codes,
            jobs,
            worker,
        }
    }
}
