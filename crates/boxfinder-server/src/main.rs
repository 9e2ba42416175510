mod api;
mod discovery;
mod middleware;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use boxfinder_core::AppConfig;
use boxfinder_db::PgRunReporter;
use boxfinder_pipeline::{build_pipeline, RunGuard, RunOptions, TracingReporter};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    discovery::{DiscoveryService, PipelineLauncher},
};

const RUN_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = boxfinder_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = boxfinder_db::PoolConfig::from_app_config(&config);
    let pool = boxfinder_db::connect_pool(&config.database_url, pool_config).await?;
    boxfinder_db::run_migrations(&pool).await?;

    let shutdown = CancellationToken::new();
    let discovery = discovery_service(&config, &pool, &shutdown);

    let _scheduler = match &discovery {
        Some(service) => {
            Some(scheduler::build_scheduler(service.clone(), &config.discovery_cron).await?)
        }
        None => None,
    };

    let app = build_app(AppState {
        pool,
        discovery: discovery.clone(),
    });

    tracing::info!(addr = %config.bind_addr, env = %config.env, "boxfinder server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    // A cancelled run still writes its partial report before releasing the
    // guard.
    if let Some(service) = discovery {
        if tokio::time::timeout(RUN_DRAIN_TIMEOUT, service.wait_idle())
            .await
            .is_err()
        {
            tracing::warn!("discovery run did not finish reporting before shutdown");
        }
    }
    Ok(())
}

/// Assembles the pipeline, or logs why discovery is disabled.
fn discovery_service(
    config: &AppConfig,
    pool: &PgPool,
    shutdown: &CancellationToken,
) -> Option<DiscoveryService> {
    let reporter = (PgRunReporter::new(pool.clone()), TracingReporter);
    match build_pipeline(config, pool.clone(), reporter, shutdown.clone()) {
        Ok(pipeline) => {
            let launcher = PipelineLauncher::new(
                pipeline,
                RunOptions::from_app_config(config),
                shutdown.clone(),
            );
            Some(DiscoveryService::new(Arc::new(launcher), RunGuard::new()))
        }
        Err(e) => {
            tracing::warn!(error = %e, "discovery pipeline unavailable; serving read-only API");
            None
        }
    }
}

/// Resolves on Ctrl-C or SIGTERM and cancels any in-flight run.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
    shutdown.cancel();
}
