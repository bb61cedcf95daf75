//! Health Check API Handler
//!
//! Reports database reachability and the number of orphaned claims, so
//! monitoring can alert on stub-less dispatches.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::api::AppState;
use crate::service::Dispatcher;

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    if let Err(e) = sqlx::query("SELECT 1").execute(&state.pool).await {
        tracing::warn!("Health check database ping failed: {}", e);
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "unavailable" })),
        );
    }

    let orphaned_claims = orphaned_claims(&state.dispatcher).await;

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "orphaned_claims": orphaned_claims,
        })),
    )
}

/// Orphan count for the health body; the periodic reporter owns the warning
async fn orphaned_claims(dispatcher: &Dispatcher) -> Option<u64> {
    match dispatcher.count_orphans().await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!("Failed to count orphaned claims: {}", e);
            None
        }
    }
}
