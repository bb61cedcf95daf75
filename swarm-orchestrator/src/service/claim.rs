//! Claim Transactor
//!
//! Authoritative write of the dispatch path: moves a candidate from
//! Pending to Claimed through the store's compare-and-swap. Losing the race
//! is a normal `false`, not an error.

use chrono::{DateTime, Utc};
use swarm_core::domain::assignment::AssignmentId;

use crate::repository::{AssignmentStore, StoreError};

pub async fn claim_assignment(
    store: &dyn AssignmentStore,
    assignment_id: AssignmentId,
    platform_id: &str,
    client_id: &str,
    now: DateTime<Utc>,
) -> Result<bool, StoreError> {
    let claimed = store
        .try_claim(assignment_id, platform_id, client_id, now)
        .await?;

    if claimed {
        tracing::debug!(
            assignment_id,
            platform_id,
            client_id,
            "Assignment claimed"
        );
    } else {
        tracing::debug!(
            assignment_id,
            platform_id,
            client_id,
            "Assignment already taken by another dispatch"
        );
    }

    Ok(claimed)
}
