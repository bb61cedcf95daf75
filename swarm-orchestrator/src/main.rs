use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use swarm_orchestrator::api::{self, AppState};
use swarm_orchestrator::config::Config;
use swarm_orchestrator::db;
use swarm_orchestrator::repository::PgAssignmentStore;
use swarm_orchestrator::service::{DispatchSettings, Dispatcher, PriorityPolicy};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "swarm_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Swarm Orchestrator...");

    let config = Config::from_env()?;
    config.validate()?;

    match config.priority_account {
        Some(account) => tracing::info!("Priority account: {}", account),
        None => tracing::info!("No priority account configured"),
    }

    tracing::info!("Connecting to database...");

    // Create database connection pool
    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to create database pool")?;

    tracing::info!("Database connection pool created");

    // Run migrations
    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(PgAssignmentStore::new(pool.clone())),
        PriorityPolicy::new(config.priority_account),
        DispatchSettings::from(&config),
    ));

    spawn_orphan_reporter(Arc::clone(&dispatcher), config.orphan_report_interval);

    let addr = config.bind_addr.clone();

    // Build router with all API endpoints
    let app = api::create_router(AppState {
        pool,
        config: Arc::new(config),
        dispatcher,
    });

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}

/// Periodically surface claims that never received a result stub
fn spawn_orphan_reporter(
    dispatcher: Arc<Dispatcher>,
    interval: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = dispatcher.report_orphans().await {
                tracing::warn!("Failed to count orphaned claims: {}", e);
            }
        }
    })
}
