//! Assignment Store
//!
//! Persistence seam for the dispatch core. The selector reads an advisory
//! snapshot through [`AssignmentStore::pending_candidates`]; exclusivity is
//! enforced only by [`AssignmentStore::try_claim`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use swarm_core::domain::assignment::AssignmentId;
use swarm_core::domain::result_stub::ResultStubId;
use thiserror::Error;
use uuid::Uuid;

/// Store error type
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("assignment {0} is no longer claimed")]
    NotClaimed(AssignmentId),

    #[error("run {run_id} already has an assignment for platform {platform_id}")]
    Duplicate { run_id: Uuid, platform_id: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A pending assignment as seen by the selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub assignment_id: AssignmentId,
    pub run_id: Uuid,
    pub owner_id: Uuid,
    /// Most recent `updated_at` across all of the owner's assignments on the platform
    pub owner_last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub job_name: String,
    pub run_name: String,
}

impl Candidate {
    pub fn description(&self) -> String {
        format!("{} {}", self.job_name, self.run_name)
    }
}

/// Result stub to persist after a successful claim
#[derive(Debug, Clone)]
pub struct NewResultStub {
    pub assignment_id: AssignmentId,
    pub run_id: Uuid,
    pub client_id: String,
    pub credential_hash: String,
    pub created_at: DateTime<Utc>,
    pub expected_update_at: DateTime<Utc>,
}

/// Repository trait for the assignment dispatch tables
///
/// Implementations must make `try_claim` a single atomic compare-and-swap
/// against the backing store; an in-process lock is not enough once more
/// than one orchestrator shares the store.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Pending assignments for `platform_id`, skipping the ids in `exclude`.
    ///
    /// Implementations may return only the newest pending assignment per owner.
    async fn pending_candidates(
        &self,
        platform_id: &str,
        exclude: &[AssignmentId],
    ) -> Result<Vec<Candidate>>;

    /// Transition a Pending assignment to Claimed.
    ///
    /// Returns `true` iff exactly one row moved. A row that is no longer
    /// Pending, or does not belong to `platform_id`, yields `false`.
    async fn try_claim(
        &self,
        assignment_id: AssignmentId,
        platform_id: &str,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Persist a result stub and link it to its claimed assignment
    async fn insert_result_stub(&self, stub: NewResultStub) -> Result<ResultStubId>;

    /// Flag a claimed assignment that ended up without a result stub
    async fn flag_orphaned(&self, assignment_id: AssignmentId, now: DateTime<Utc>) -> Result<()>;

    /// Number of claimed assignments currently flagged as orphaned
    async fn count_orphaned(&self) -> Result<u64>;
}
