//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod client;
pub mod error;
pub mod health;
pub mod run;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::service::Dispatcher;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub dispatcher: Arc<Dispatcher>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Dispatch endpoint (POST only; other methods get 405)
        .route("/api/getrun", post(run::get_run))
        // Client endpoints
        .route("/api/clients/register", post(client::register_client))
        .route("/api/clients/{id}/heartbeat", post(client::client_heartbeat))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
