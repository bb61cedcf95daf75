//! Client API Handlers
//!
//! HTTP endpoints for worker client registration and aliveness.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use swarm_core::domain::client::Client;
use swarm_core::dto::client::RegisterClient;

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::client_service;

/// POST /api/clients/register
/// Register a client with the orchestrator
pub async fn register_client(
    State(state): State<AppState>,
    Json(req): Json<RegisterClient>,
) -> ApiResult<Json<Client>> {
    tracing::info!("Registering client: {}", req.client_id);

    let client = client_service::register_client(&state.pool, req).await?;

    Ok(Json(client))
}

/// POST /api/clients/{id}/heartbeat
/// Keep a client marked as alive between polls
pub async fn client_heartbeat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    client_service::update_heartbeat(&state.pool, &id).await?;

    Ok(StatusCode::NO_CONTENT)
}
