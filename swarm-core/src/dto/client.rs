//! Client DTOs
//!
//! Data transfer objects for client-related operations.

use serde::{Deserialize, Serialize};

/// Request to register a worker client with the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterClient {
    /// Unique identifier for the client
    pub client_id: String,

    /// Human readable name (e.g. the browser's display name)
    pub name: String,

    /// Platform this client will execute runs for
    pub platform_id: String,
}
