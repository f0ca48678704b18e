use std::sync::Arc;

use anyhow::Context;
use portal_db::store::PgStore;
use portal_gamma::{GammaApi, GammaConfig};
use portal_pipeline::{JobWorker, PipelineSettings, StatusSynchronizer};
use portal_storage::{StorageConfig, SupabaseStorage};
use portal_worker::{tick_interval_from_env, WorkerLoop};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "portal_worker=debug,portal_pipeline=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = portal_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    portal_db::health_check(&pool)
        .await
        .context("Database health check failed")?;

    let http = reqwest::Client::new();
    let store = Arc::new(PgStore::new(pool));
    let provider = Arc::new(GammaApi::with_client(http.clone(), GammaConfig::from_env()));
    let storage = Arc::new(SupabaseStorage::with_client(http, StorageConfig::from_env()));
    let synchronizer = Arc::new(StatusSynchronizer::new(
        store.clone(),
        provider.clone(),
        storage,
        PipelineSettings::from_env(),
    ));
    let worker = Arc::new(JobWorker::new(store, provider, synchronizer));

    let cancel = CancellationToken::new();
    let worker_loop = WorkerLoop::new(worker, tick_interval_from_env());
    let loop_cancel = cancel.clone();
    let handle = tokio::spawn(async move { worker_loop.run(loop_cancel).await });

    shutdown_signal().await?;
    cancel.cancel();
    handle.await.context("Worker loop panicked")?;

    tracing::info!("Worker stopped");
    Ok(())
}

/// Resolve on SIGINT or (on Unix) SIGTERM.
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .context("Failed to install SIGTERM handler")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.context("Failed to listen for Ctrl-C")?;
                tracing::info!("Received SIGINT (Ctrl-C), shutting down");
            }
            _ = terminate.recv() => {
                tracing::info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        tracing::info!("Received SIGINT (Ctrl-C), shutting down");
    }

    Ok(())
}
