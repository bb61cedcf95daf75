//! Client Service
//!
//! Registration, aliveness and request verification for worker clients.
//! Verification runs before any dispatch work; a rejected client never
//! reaches the selector.

use sqlx::PgPool;
use swarm_core::domain::client::Client;
use swarm_core::dto::client::RegisterClient;
use thiserror::Error;

use super::credential::verify_credential;
use crate::config::Config;
use crate::repository::client_repository;

/// Service error type
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error("client {0} not found")]
    NotFound(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Register a client with the orchestrator
///
/// Re-registering an existing id updates its name and platform.
pub async fn register_client(pool: &PgPool, req: RegisterClient) -> Result<Client> {
    validate_register_request(&req)?;

    let client = client_repository::register(pool, req).await?;

    tracing::info!(
        "Client registered: {} ({}) on platform {}",
        client.id,
        client.name,
        client.platform_id
    );

    Ok(client)
}

/// Update the aliveness timestamp for a client
pub async fn update_heartbeat(pool: &PgPool, client_id: &str) -> Result<()> {
    let updated = client_repository::touch(pool, client_id).await?;

    if !updated {
        return Err(ClientError::NotFound(client_id.to_string()));
    }

    tracing::debug!("Heartbeat received from client: {}", client_id);

    Ok(())
}

/// Verify a polling client and refresh its aliveness
///
/// The returned client's registered platform is what work is dispatched
/// against; the request never names a platform itself.
pub async fn authenticate(
    pool: &PgPool,
    config: &Config,
    client_id: Option<&str>,
    run_token: Option<&str>,
) -> Result<Client> {
    check_run_token(config, run_token)?;

    let client_id = client_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ClientError::MissingInput("client_id is required".to_string()))?;

    let client = client_repository::find_by_id(pool, client_id)
        .await?
        .ok_or_else(|| ClientError::NotAuthorized(format!("Unknown client {}", client_id)))?;

    client_repository::touch(pool, client_id).await?;

    Ok(client)
}

// =============================================================================
// Validation
// =============================================================================

fn check_run_token(config: &Config, run_token: Option<&str>) -> Result<()> {
    if !config.require_run_token {
        return Ok(());
    }

    let token = run_token.filter(|t| !t.is_empty()).ok_or_else(|| {
        ClientError::MissingInput(
            "This swarm does not allow unauthorized clients to join".to_string(),
        )
    })?;

    let expected = config.run_token_hash.as_deref().unwrap_or_default();
    if !verify_credential(token, expected) {
        return Err(ClientError::NotAuthorized("Invalid run token".to_string()));
    }

    Ok(())
}

fn validate_register_request(req: &RegisterClient) -> Result<()> {
    if req.client_id.trim().is_empty() {
        return Err(ClientError::ValidationError(
            "Client ID cannot be empty".to_string(),
        ));
    }

    if req.client_id.len() > 255 {
        return Err(ClientError::ValidationError(
            "Client ID is too long (max 255 characters)".to_string(),
        ));
    }

    if req.platform_id.trim().is_empty() {
        return Err(ClientError::ValidationError(
            "Platform ID cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::credential::hash_credential;

    fn token_config() -> Config {
        Config {
            require_run_token: true,
            run_token_hash: Some(hash_credential("s3cret")),
            ..Config::default()
        }
    }

    #[test]
    fn test_run_token_not_required() {
        assert!(check_run_token(&Config::default(), None).is_ok());
        assert!(check_run_token(&Config::default(), Some("anything")).is_ok());
    }

    #[test]
    fn test_missing_run_token_is_missing_input() {
        let config = token_config();
        assert!(matches!(
            check_run_token(&config, None),
            Err(ClientError::MissingInput(_))
        ));
        assert!(matches!(
            check_run_token(&config, Some("")),
            Err(ClientError::MissingInput(_))
        ));
    }

    #[test]
    fn test_wrong_run_token_is_not_authorized() {
        let config = token_config();
        assert!(matches!(
            check_run_token(&config, Some("guess")),
            Err(ClientError::NotAuthorized(_))
        ));
        assert!(check_run_token(&config, Some("s3cret")).is_ok());
    }

    #[test]
    fn test_validate_register_request() {
        let mut req = RegisterClient {
            client_id: "ff-01".to_string(),
            name: "Firefox 120".to_string(),
            platform_id: "firefox-120".to_string(),
        };
        assert!(validate_register_request(&req).is_ok());

        req.platform_id = " ".to_string();
        assert!(validate_register_request(&req).is_err());

        req.platform_id = "firefox-120".to_string();
        req.client_id = "x".repeat(256);
        assert!(validate_register_request(&req).is_err());
    }
}
