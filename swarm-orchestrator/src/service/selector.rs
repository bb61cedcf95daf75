//! Priority-Fairness Selector
//!
//! Picks the next assignment to offer for a platform from an advisory
//! snapshot of pending work:
//! 1. group candidates by owner
//! 2. rank owners by tier (desc), last activity (asc), owner id (asc)
//! 3. within the winning owner take the newest assignment (created_at, then id, desc)

use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::priority::PriorityPolicy;
use crate::repository::Candidate;

struct OwnerGroup {
    last_activity: DateTime<Utc>,
    newest: Candidate,
}

/// Choose the single best candidate, or `None` when nothing is pending
pub fn select_candidate(candidates: Vec<Candidate>, policy: &PriorityPolicy) -> Option<Candidate> {
    let mut groups: HashMap<Uuid, OwnerGroup> = HashMap::new();

    for candidate in candidates {
        match groups.get_mut(&candidate.owner_id) {
            Some(group) => {
                group.last_activity = group.last_activity.max(candidate.owner_last_activity);
                if newer(&candidate, &group.newest) {
                    group.newest = candidate;
                }
            }
            None => {
                groups.insert(
                    candidate.owner_id,
                    OwnerGroup {
                        last_activity: candidate.owner_last_activity,
                        newest: candidate,
                    },
                );
            }
        }
    }

    groups
        .into_iter()
        .min_by_key(|(owner_id, group)| {
            (
                Reverse(policy.tier(*owner_id)),
                group.last_activity,
                *owner_id,
            )
        })
        .map(|(_, group)| group.newest)
}

fn newer(a: &Candidate, b: &Candidate) -> bool {
    (a.created_at, a.assignment_id) > (b.created_at, b.assignment_id)
}
