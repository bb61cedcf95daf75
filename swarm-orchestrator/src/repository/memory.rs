//! In-memory Assignment Store
//!
//! Mutex-guarded tables with the same compare-and-swap semantics as the
//! Postgres store. Used by tests and local runs without a database; the
//! fault switches let callers simulate persistence failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use swarm_core::domain::assignment::{Assignment, AssignmentId, AssignmentStatus};
use swarm_core::domain::job::{Job, Run};
use swarm_core::domain::result_stub::{ResultStub, ResultStubId};
use uuid::Uuid;

use super::assignment::{AssignmentStore, Candidate, NewResultStub, Result, StoreError};

#[derive(Debug, Default)]
struct Tables {
    jobs: HashMap<Uuid, Job>,
    runs: HashMap<Uuid, Run>,
    assignments: Vec<Assignment>,
    result_stubs: Vec<ResultStub>,
}

impl Tables {
    fn owner_of(&self, run_id: &Uuid) -> Option<(&Run, &Job)> {
        let run = self.runs.get(run_id)?;
        let job = self.jobs.get(&run.job_id)?;
        Some((run, job))
    }
}

/// Assignment store kept entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryAssignmentStore {
    tables: Mutex<Tables>,
    fail_reads: AtomicBool,
    fail_claims: AtomicBool,
    fail_stub_inserts: AtomicBool,
}

impl MemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    /// Make every subsequent read (`pending_candidates`, `count_orphaned`) fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read failed".to_string()));
        }
        Ok(())
    }

    /// Make every subsequent `try_claim` fail with a store error
    pub fn set_fail_claims(&self, fail: bool) {
        self.fail_claims.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `insert_result_stub` fail with a store error
    pub fn set_fail_stub_inserts(&self, fail: bool) {
        self.fail_stub_inserts.store(fail, Ordering::SeqCst);
    }

    // =============================================================================
    // Seeding
    // =============================================================================

    pub fn add_job(&self, owner_id: Uuid, name: &str) -> Result<Uuid> {
        let job = Job {
            id: Uuid::new_v4(),
            owner_id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        let id = job.id;
        self.tables()?.jobs.insert(id, job);
        Ok(id)
    }

    pub fn add_run(&self, job_id: Uuid, name: &str, url: &str) -> Result<Uuid> {
        let run = Run {
            id: Uuid::new_v4(),
            job_id,
            name: name.to_string(),
            url: url.to_string(),
            created_at: Utc::now(),
        };
        let id = run.id;
        self.tables()?.runs.insert(id, run);
        Ok(id)
    }

    /// Add a Pending assignment created and last updated at `at`
    pub fn add_assignment(
        &self,
        run_id: Uuid,
        platform_id: &str,
        at: DateTime<Utc>,
    ) -> Result<AssignmentId> {
        self.add_assignment_with_status(run_id, platform_id, AssignmentStatus::Pending, at)
    }

    /// Add an assignment in an arbitrary state, e.g. to model earlier dispatch activity
    pub fn add_assignment_with_status(
        &self,
        run_id: Uuid,
        platform_id: &str,
        status: AssignmentStatus,
        at: DateTime<Utc>,
    ) -> Result<AssignmentId> {
        let mut tables = self.tables()?;

        if tables
            .assignments
            .iter()
            .any(|a| a.run_id == run_id && a.platform_id == platform_id)
        {
            return Err(StoreError::Duplicate {
                run_id,
                platform_id: platform_id.to_string(),
            });
        }

        let id = tables.assignments.len() as AssignmentId + 1;
        tables.assignments.push(Assignment {
            id,
            run_id,
            platform_id: platform_id.to_string(),
            status,
            created_at: at,
            updated_at: at,
            claimed_by: None,
            claimed_at: None,
            result_stub_id: None,
            orphaned_at: None,
        });

        Ok(id)
    }

    // =============================================================================
    // Inspection
    // =============================================================================

    pub fn assignment(&self, id: AssignmentId) -> Option<Assignment> {
        let tables = self.tables().ok()?;
        tables.assignments.iter().find(|a| a.id == id).cloned()
    }

    pub fn result_stubs_for(&self, assignment_id: AssignmentId) -> Vec<ResultStub> {
        match self.tables() {
            Ok(tables) => tables
                .result_stubs
                .iter()
                .filter(|s| s.assignment_id == assignment_id)
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl AssignmentStore for MemoryAssignmentStore {
    async fn pending_candidates(
        &self,
        platform_id: &str,
        exclude: &[AssignmentId],
    ) -> Result<Vec<Candidate>> {
        self.check_reads()?;
        let tables = self.tables()?;
        let tables = &*tables;

        let mut activity: HashMap<Uuid, DateTime<Utc>> = HashMap::new();
        for assignment in tables.assignments.iter().filter(|a| a.platform_id == platform_id) {
            if let Some((_, job)) = tables.owner_of(&assignment.run_id) {
                let latest = activity.entry(job.owner_id).or_insert(assignment.updated_at);
                if assignment.updated_at > *latest {
                    *latest = assignment.updated_at;
                }
            }
        }

        let candidates = tables
            .assignments
            .iter()
            .filter(|a| {
                a.platform_id == platform_id
                    && a.status == AssignmentStatus::Pending
                    && !exclude.contains(&a.id)
            })
            .filter_map(|a| {
                let (run, job) = tables.owner_of(&a.run_id)?;
                Some(Candidate {
                    assignment_id: a.id,
                    run_id: a.run_id,
                    owner_id: job.owner_id,
                    owner_last_activity: *activity.get(&job.owner_id)?,
                    created_at: a.created_at,
                    url: run.url.clone(),
                    job_name: job.name.clone(),
                    run_name: run.name.clone(),
                })
            })
            .collect();

        Ok(candidates)
    }

    async fn try_claim(
        &self,
        assignment_id: AssignmentId,
        platform_id: &str,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if self.fail_claims.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("claim write failed".to_string()));
        }

        let mut tables = self.tables()?;

        let Some(assignment) = tables
            .assignments
            .iter_mut()
            .find(|a| a.id == assignment_id && a.platform_id == platform_id)
        else {
            return Ok(false);
        };

        if !assignment.status.can_transition_to(AssignmentStatus::Claimed) {
            return Ok(false);
        }

        assignment.status = AssignmentStatus::Claimed;
        assignment.updated_at = now;
        assignment.claimed_at = Some(now);
        assignment.claimed_by = Some(client_id.to_string());

        Ok(true)
    }

    async fn insert_result_stub(&self, stub: NewResultStub) -> Result<ResultStubId> {
        if self.fail_stub_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("result stub insert failed".to_string()));
        }

        let mut tables = self.tables()?;
        let stub_id = tables.result_stubs.len() as ResultStubId + 1;

        let assignment = tables
            .assignments
            .iter_mut()
            .find(|a| {
                a.id == stub.assignment_id
                    && a.status == AssignmentStatus::Claimed
                    && a.result_stub_id.is_none()
            })
            .ok_or(StoreError::NotClaimed(stub.assignment_id))?;
        assignment.result_stub_id = Some(stub_id);

        tables.result_stubs.push(ResultStub {
            id: stub_id,
            assignment_id: stub.assignment_id,
            run_id: stub.run_id,
            client_id: stub.client_id,
            credential_hash: stub.credential_hash,
            created_at: stub.created_at,
            updated_at: stub.created_at,
            expected_update_at: stub.expected_update_at,
        });

        Ok(stub_id)
    }

    async fn flag_orphaned(&self, assignment_id: AssignmentId, now: DateTime<Utc>) -> Result<()> {
        let mut tables = self.tables()?;

        if let Some(assignment) = tables.assignments.iter_mut().find(|a| {
            a.id == assignment_id
                && a.status == AssignmentStatus::Claimed
                && a.result_stub_id.is_none()
        }) {
            assignment.orphaned_at = Some(now);
        }

        Ok(())
    }

    async fn count_orphaned(&self) -> Result<u64> {
        self.check_reads()?;
        let tables = self.tables()?;
        let count = tables
            .assignments
            .iter()
            .filter(|a| {
                a.status == AssignmentStatus::Claimed
                    && a.orphaned_at.is_some()
                    && a.result_stub_id.is_none()
            })
            .count();

        Ok(count as u64)
    }
}
