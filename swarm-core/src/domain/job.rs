//! Job and run domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A submitted job, owning one or more runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A named test scenario belonging to a job
///
/// A run is dispatched once per platform it targets; see [`Assignment`](super::assignment::Assignment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub job_id: Uuid,
    pub name: String,
    pub url: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
