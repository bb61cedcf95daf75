//! Assignment domain types
//!
//! An assignment pairs one run with one platform and is the unit of
//! dispatchable work.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Insertion-ordered assignment identifier
pub type AssignmentId = i64;

/// Run x platform work item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub run_id: Uuid,
    pub platform_id: String,
    pub status: AssignmentStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub result_stub_id: Option<i64>,
    /// Set when a claim succeeded but its result stub could not be stored
    pub orphaned_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Assignment dispatch status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentStatus {
    Pending,
    Claimed,
    Done,
}

impl AssignmentStatus {
    /// Whether moving from `self` to `next` is a legal lifecycle step.
    ///
    /// `Claimed -> Pending` is only taken by the timeout reclaim path.
    pub fn can_transition_to(self, next: AssignmentStatus) -> bool {
        matches!(
            (self, next),
            (AssignmentStatus::Pending, AssignmentStatus::Claimed)
                | (AssignmentStatus::Claimed, AssignmentStatus::Done)
                | (AssignmentStatus::Claimed, AssignmentStatus::Pending)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "Pending",
            AssignmentStatus::Claimed => "Claimed",
            AssignmentStatus::Done => "Done",
        }
    }
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AssignmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(AssignmentStatus::Pending),
            "Claimed" => Ok(AssignmentStatus::Claimed),
            "Done" => Ok(AssignmentStatus::Done),
            other => Err(format!("unknown assignment status: {}", other)),
        }
    }
}
