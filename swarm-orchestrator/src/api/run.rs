//! Run Dispatch API Handlers
//!
//! HTTP endpoint polled by worker clients for their next run.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use swarm_core::dto::run::{GetRunRequest, GetRunResponse};

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::client_service;

/// POST /api/getrun
/// Verify the polling client and hand it the next run for its platform.
/// An empty `runInfo` means there is no work, which is not an error.
pub async fn get_run(
    State(state): State<AppState>,
    payload: Result<Json<GetRunRequest>, JsonRejection>,
) -> ApiResult<Json<GetRunResponse>> {
    let Json(req) = payload?;

    let client = client_service::authenticate(
        &state.pool,
        &state.config,
        req.client_id.as_deref(),
        req.run_token.as_deref(),
    )
    .await?;

    tracing::debug!(
        "Client {} requesting run for platform {}",
        client.id,
        client.platform_id
    );

    let run_info = state
        .dispatcher
        .get_next_run(&client.platform_id, &client.id)
        .await?;

    Ok(Json(GetRunResponse { run_info }))
}
