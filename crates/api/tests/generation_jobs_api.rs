//! Generation job endpoints: enqueue, worker tick and status polling.

mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode};
use common::{body_json, get, send, send_json};
use portal_core::status::JobStatus;
use portal_gamma::GenerationSnapshot;
use serde_json::json;
use uuid::Uuid;

const JOBS: &str = "/api/v1/generation-jobs";
const TICK: &str = "/api/v1/generation-jobs/worker-tick";
const EXPORT_URL: &str = "https://provider/x.pptx";

async fn enqueue(app: &common::TestApp, body: serde_json::Value) -> Uuid {
    let response = send_json(&app.router, Method::POST, JOBS, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "pending");
    json["data"]["jobId"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn acme_job_end_to_end() {
    let app = common::build_test_app();
    let job_id = enqueue(
        &app,
        json!({ "prompt": "Supplier deck", "inputJson": { "companyName": "Acme" } }),
    )
    .await;

    app.provider.push_generation_id("g1");
    app.provider
        .push_status("g1", GenerationSnapshot::new("completed").with_export_url(EXPORT_URL));
    app.provider.add_artifact(EXPORT_URL, b"deck");

    let tick = body_json(send(&app.router, Method::POST, TICK, None, None).await).await;
    assert_eq!(tick["data"]["ok"], true);
    assert_eq!(tick["data"]["processedJobId"], job_id.to_string());

    let stored = app.store.job(job_id).unwrap();
    assert_eq!(stored.status(), JobStatus::Done);
    assert!(stored.file_path.is_some());

    let response = get(&app.router, &format!("{JOBS}/{job_id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "done");
    assert_eq!(json["data"]["progress"], 100);
    assert!(json["data"]["downloadUrl"].is_string());
}

#[tokio::test]
async fn status_poll_drives_a_running_job() {
    let mut config = common::test_config();
    config.pipeline.worker_poll_interval = Duration::from_secs(30);
    config.pipeline.worker_hard_timeout = Duration::from_millis(50);
    let app = common::build_test_app_with(config);
    let job_id = enqueue(&app, json!({ "prompt": "Deck", "inputJson": {} })).await;

    app.provider.push_generation_id("g1");
    app.provider.push_status("g1", GenerationSnapshot::new("processing"));
    app.provider
        .push_status("g1", GenerationSnapshot::new("completed").with_export_url(EXPORT_URL));
    app.provider.add_artifact(EXPORT_URL, b"deck");

    // The worker submits, then hits its hard timeout before the first sync.
    let tick = body_json(send(&app.router, Method::POST, TICK, None, None).await).await;
    assert_eq!(tick["data"]["ok"], true);
    assert_eq!(app.store.job(job_id).unwrap().status(), JobStatus::Running);

    let first = body_json(get(&app.router, &format!("{JOBS}/{job_id}")).await).await;
    assert_eq!(first["data"]["status"], "running");
    assert!(first["data"]["downloadUrl"].is_null());

    let second = body_json(get(&app.router, &format!("{JOBS}/{job_id}")).await).await;
    assert_eq!(second["data"]["status"], "done");
    assert!(second["data"]["downloadUrl"].is_string());
}

#[tokio::test]
async fn tick_outlasting_the_request_timeout_still_reports_its_outcome() {
    // Production ordering: the worker budget exceeds the request timeout.
    let mut config = common::test_config();
    config.request_timeout_secs = 1;
    config.pipeline.worker_poll_interval = Duration::from_millis(100);
    config.pipeline.worker_hard_timeout = Duration::from_millis(1500);
    let app = common::build_test_app_with(config);
    let job_id = enqueue(&app, json!({ "prompt": "Deck", "inputJson": {} })).await;

    app.provider.push_generation_id("g1");
    app.provider.push_status("g1", GenerationSnapshot::new("processing"));

    let response = send(&app.router, Method::POST, TICK, None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let tick = body_json(response).await;
    assert_eq!(tick["data"]["ok"], true);
    assert_eq!(tick["data"]["processedJobId"], job_id.to_string());
    assert_eq!(app.store.job(job_id).unwrap().status(), JobStatus::Running);

    // Client routes keep the short request timeout.
    let poll = get(&app.router, &format!("{JOBS}/{job_id}")).await;
    assert_eq!(poll.status(), StatusCode::OK);
}

#[tokio::test]
async fn terminal_job_payload_is_stable() {
    let app = common::build_test_app();
    let job_id = enqueue(&app, json!({ "prompt": "Deck", "inputJson": {} })).await;
    app.provider.push_generation_id("g1");
    app.provider
        .push_status("g1", GenerationSnapshot::new("failed").with_error("quota exceeded"));

    let tick = body_json(send(&app.router, Method::POST, TICK, None, None).await).await;
    assert_eq!(tick["data"]["ok"], false);
    assert_eq!(tick["data"]["error"], "quota exceeded");
    let reads = app.provider.status_reads();

    let first = body_json(get(&app.router, &format!("{JOBS}/{job_id}")).await).await;
    let second = body_json(get(&app.router, &format!("{JOBS}/{job_id}")).await).await;
    assert_eq!(first, second);
    assert_eq!(first["data"]["status"], "failed");
    assert_eq!(first["data"]["error"], "quota exceeded");
    assert!(first["data"]["downloadUrl"].is_null());
    assert_eq!(app.provider.status_reads(), reads);
}

#[tokio::test]
async fn idle_tick_processes_nothing() {
    let app = common::build_test_app();
    let json = body_json(send(&app.router, Method::POST, TICK, None, None).await).await;
    assert_eq!(json["data"]["ok"], true);
    assert!(json["data"]["processedJobId"].is_null());
}

#[tokio::test]
async fn tick_requires_cron_secret_when_configured() {
    let mut config = common::test_config();
    config.cron_secret = Some("s3cret".into());
    let app = common::build_test_app_with(config);

    let denied = send(&app.router, Method::POST, TICK, None, None).await;
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let wrong = send(&app.router, Method::POST, TICK, None, Some("guess")).await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let allowed = send(&app.router, Method::POST, TICK, None, Some("s3cret")).await;
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn enqueue_validates_input() {
    let app = common::build_test_app();

    let not_object = send_json(
        &app.router,
        Method::POST,
        JOBS,
        json!({ "prompt": "Deck", "inputJson": "Acme" }),
    )
    .await;
    assert_eq!(not_object.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(not_object).await["code"], "VALIDATION_ERROR");

    let no_prompt = send_json(&app.router, Method::POST, JOBS, json!({ "inputJson": {} })).await;
    assert_eq!(no_prompt.status(), StatusCode::BAD_REQUEST);

    let bad_form = send_json(
        &app.router,
        Method::POST,
        JOBS,
        json!({
            "prompt": "Deck",
            "inputJson": { "supplierType": "contractor", "companyName": "Acme", "website": "nope" }
        }),
    )
    .await;
    assert_eq!(bad_form.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_job_is_404() {
    let app = common::build_test_app();
    let response = get(&app.router, &format!("{JOBS}/{}", Uuid::now_v7())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}
