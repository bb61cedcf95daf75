//! Priority classification
//!
//! Maps a job owner to a dispatch tier. The designated priority account is
//! configuration, never a query literal.

use uuid::Uuid;

/// Dispatch tier of a job owner; higher tiers are served first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PriorityTier {
    Ordinary = 1,
    Priority = 2,
}

/// Classifies owners against the configured priority account
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityPolicy {
    priority_account: Option<Uuid>,
}

impl PriorityPolicy {
    pub fn new(priority_account: Option<Uuid>) -> Self {
        Self { priority_account }
    }

    pub fn tier(&self, owner_id: Uuid) -> PriorityTier {
        if self.priority_account == Some(owner_id) {
            PriorityTier::Priority
        } else {
            PriorityTier::Ordinary
        }
    }
}
