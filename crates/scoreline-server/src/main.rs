mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use chrono::{Duration, Utc};
use scoreline_db::{PgStore, SharedStore};
use scoreline_jobs::{JobQueue, QueueConfig};
use scoreline_pipeline::Pipeline;
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};
use crate::middleware::{AuthState, CronSecret};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = scoreline_core::load_app_config()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let pool = scoreline_db::connect_pool(
        &config.database_url,
        scoreline_db::PoolConfig::from_app_config(&config),
    )
    .await?;
    let applied = scoreline_db::run_migrations(&pool).await?;
    tracing::info!(applied, "database migrations applied");

    let store: SharedStore = Arc::new(PgStore::new(pool));

    // Runs left active by a previous process would block their source forever.
    let cutoff = Utc::now() - Duration::minutes(config.stale_run_minutes);
    let recovered = store
        .fail_stale_runs(cutoff, "abandoned by a previous server process")
        .await?;
    if recovered > 0 {
        tracing::warn!(recovered, "failed stale fetch and query runs");
    }

    let queue = JobQueue::new(QueueConfig::from_app_config(&config));
    let pipeline = Pipeline::from_app_config(&config, Arc::clone(&store), queue.clone())?;
    let dedup = pipeline.dedup().clone();
    queue.start(Arc::new(pipeline))?;

    let _scheduler =
        scheduler::build_scheduler(Arc::clone(&store), queue.clone(), &config).await?;

    let is_dev = config.env == scoreline_core::Environment::Development;
    let auth = AuthState::from_env(is_dev)?;
    let cron_secret = CronSecret::new(config.cron_secret.as_deref());
    if !cron_secret.is_configured() {
        tracing::warn!("SCORELINE_CRON_SECRET not set; /cron endpoints will reject every call");
    }

    let app = build_app(
        AppState {
            store,
            queue: queue.clone(),
            dedup,
            cron_secret,
        },
        auth,
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped; draining in-flight jobs");
    if tokio::time::timeout(std::time::Duration::from_secs(30), queue.wait_idle())
        .await
        .is_err()
    {
        tracing::warn!("job queue did not drain before shutdown deadline");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
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

    tracing::info!("shutdown signal received");
}
