//! Result stub domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::assignment::AssignmentId;

pub type ResultStubId = i64;

/// Tracking record created when an assignment is dispatched
///
/// Only the hash of the one-time result credential is ever stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultStub {
    pub id: ResultStubId,
    pub assignment_id: AssignmentId,
    pub run_id: Uuid,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub credential_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    /// Deadline after which the reclaim process may treat the run as lost
    pub expected_update_at: chrono::DateTime<chrono::Utc>,
}
