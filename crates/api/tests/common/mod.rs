#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use chrono::{DateTime, Utc};
use portal_api::config::ServerConfig;
use portal_api::router::build_app_router;
use portal_api::state::AppState;
use portal_core::duplicates::DuplicateCandidate;
use portal_core::status::SupplierStatus;
use portal_core::supplier::SupplierType;
use portal_db::memory::MemoryStore;
use portal_gamma::{GammaConfig, ScriptedProvider};
use portal_pipeline::{JobService, JobWorker, PipelineSettings, StatusSynchronizer};
use portal_storage::{MemoryStorage, StorageConfig};
use uuid::Uuid;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        cron_secret: None,
        pipeline: PipelineSettings {
            worker_poll_interval: Duration::ZERO,
            worker_hard_timeout: Duration::from_secs(5),
            ..PipelineSettings::default()
        },
        gamma: GammaConfig::default(),
        storage: StorageConfig::default(),
    }
}

/// Router plus handles on the in-memory collaborators behind it.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub provider: Arc<ScriptedProvider>,
    pub storage: Arc<MemoryStorage>,
}

pub fn build_test_app() -> TestApp {
    build_test_app_with(test_config())
}

/// Full application router with all middleware layers over in-memory
/// stores, the scripted provider and in-memory object storage.
pub fn build_test_app_with(config: ServerConfig) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(ScriptedProvider::new());
    let storage = Arc::new(MemoryStorage::new());

    let synchronizer = Arc::new(StatusSynchronizer::new(
        store.clone(),
        provider.clone(),
        storage.clone(),
        config.pipeline.clone(),
    ));
    let jobs = Arc::new(JobService::new(
        store.clone(),
        storage.clone(),
        synchronizer.clone(),
    ));
    let worker = Arc::new(JobWorker::new(
        store.clone(),
        provider.clone(),
        synchronizer,
    ));

    let state = AppState::new(None, config, store.clone(), store.clone(), jobs, worker);

    TestApp {
        router: build_app_router(state),
        store,
        provider,
        storage,
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn send_json(
    app: &Router,
    method: Method,
    uri: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, method, uri, Some(body), None).await
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
    bearer: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

pub fn ts(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

/// A submitted, user-filled supplier without an invite code.
pub fn supplier(name: &str, submitted_at: &str) -> DuplicateCandidate {
    DuplicateCandidate {
        id: Uuid::now_v7(),
        user_id: Uuid::now_v7(),
        supplier_type: SupplierType::Contractor,
        status: SupplierStatus::Submitted,
        company_name: Some(name.to_string()),
        has_invite_code: false,
        is_imported: false,
        created_at: Some(ts(submitted_at)),
        submitted_at: Some(ts(submitted_at)),
    }
}

pub fn imported(name: &str, submitted_at: &str) -> DuplicateCandidate {
    DuplicateCandidate {
        is_imported: true,
        ..supplier(name, submitted_at)
    }
}

pub fn with_invite(mut candidate: DuplicateCandidate) -> DuplicateCandidate {
    candidate.has_invite_code = true;
    candidate
}
