//! portfolio-api server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use portfolio_api::{build_schema, parse_allowed_origins, router, ApiConfig, AppState, ResponseCache};
use portfolio_auth::{DeviceTokenService, JwtConfig, JwtService};
use portfolio_clients::{GithubClient, WeaviateClient, WordPressClient};
use portfolio_core::{JobRepository, ProgressRepository};
use portfolio_db::{log_pool_metrics, Database, PoolConfig};
use portfolio_jobs::{PostSynchronizationHandler, PostSynchronizer, WorkerBuilder, WorkerConfig};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "portfolio_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "portfolio_api=debug,portfolio_jobs=info,portfolio_clients=info,tower_http=debug".into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("portfolio-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = ApiConfig::from_env();

    let db = Database::connect_with_config(&config.database_url, PoolConfig::from_env()).await?;
    db.migrate().await?;
    log_pool_metrics(&db.pool);
    info!("Database migrations applied");

    let jwt = Arc::new(JwtService::new(JwtConfig::from_env()?));
    let devices = Arc::new(DeviceTokenService::from_env()?);
    let wordpress = Arc::new(WordPressClient::from_env()?);
    let weaviate = Arc::new(WeaviateClient::from_env()?);
    let github = Arc::new(GithubClient::from_env()?);
    let progress: Arc<dyn ProgressRepository> = Arc::new(db.progress.clone());
    let jobs: Arc<dyn JobRepository> = Arc::new(db.jobs.clone());
    let cache = ResponseCache::from_env().await;

    let synchronizer = Arc::new(
        PostSynchronizer::new(wordpress.clone(), weaviate.clone(), progress.clone())
            .configured_from_env(),
    );
    info!(collection = synchronizer.collection(), "Post synchronizer configured");
    let worker = WorkerBuilder::new(jobs.clone())
        .with_config(WorkerConfig::from_env())
        .with_handler(PostSynchronizationHandler::new(synchronizer))
        .build();
    let worker_handle = worker.start();

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = AppState {
        db,
        jwt,
        devices,
        wordpress,
        weaviate,
        github,
        progress,
        jobs,
        cache,
        config: Arc::new(config),
        schema: build_schema(),
    };
    let app = router(state, parse_allowed_origins());

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Err(e) = worker_handle.shutdown().await {
        warn!(error = %e, "Job worker did not shut down cleanly");
    }
    Ok(())
}
