//! Axum API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vproc_api::{create_router, metrics, ApiConfig, AppState};
use vproc_media::{EngineConfig, FfmpegEngine};
use vproc_queue::{JobQueue, QueueConfig};
use vproc_store::StoreConfig;
use vproc_worker::{JobExecutor, Orchestrator, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    if let Err(e) = run().await {
        error!("Fatal: {:#}", e);
        std::process::exit(1);
    }
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vproc=info,tower_http=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn run() -> anyhow::Result<()> {
    info!("Starting vproc-api");

    let config = ApiConfig::from_env();
    info!("API config: host={}, port={}", config.host, config.port);

    let store_config = StoreConfig::from_env().context("invalid store configuration")?;
    let store = vproc_store::connect(&store_config).context("failed to connect job store")?;

    let engine = FfmpegEngine::new(EngineConfig::from_env()).context("failed to configure transcoding engine")?;
    if let Err(e) = engine.verify().await {
        warn!("FFmpeg check failed, jobs will fail until it is available: {}", e);
    }
    engine
        .prepare_dirs()
        .await
        .context("failed to prepare work directories")?;

    let (queue, receiver) = JobQueue::new(QueueConfig::from_env());
    let orchestrator = Arc::new(Orchestrator::new(store, Arc::new(engine), queue));

    let executor = Arc::new(JobExecutor::new(WorkerConfig::from_env(), Arc::clone(&orchestrator)));
    let worker = {
        let executor = Arc::clone(&executor);
        tokio::spawn(async move { executor.run(receiver).await })
    };

    let metrics_handle = if config.metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => {
                info!("Prometheus metrics enabled at /metrics");
                Some(handle)
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
                None
            }
        }
    } else {
        None
    };

    let app = create_router(AppState::new(config.clone(), orchestrator), metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid bind address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    executor.shutdown();
    match worker.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Worker pool stopped with error: {}", e),
        Err(e) => warn!("Worker pool task failed: {}", e),
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
