//! Dispatch Orchestrator
//!
//! End-to-end "get next run" for a verified client:
//! select a candidate, try to claim it, retry with the loser excluded up to a
//! bounded number of attempts, then issue a result stub for the winner.
//! Persistent contention ends as "no work", same as an empty queue.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use swarm_core::domain::assignment::AssignmentId;
use swarm_core::dto::run::RunInfo;
use thiserror::Error;

use super::claim::claim_assignment;
use super::issuer::issue_result_stub;
use super::priority::PriorityPolicy;
use super::selector::select_candidate;
use crate::config::Config;
use crate::repository::{AssignmentStore, Candidate, StoreError};

/// Dispatch error type
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to read pending assignments: {0}")]
    Selection(#[source] StoreError),

    #[error("result stub for claimed assignment {assignment_id} could not be stored: {source}")]
    StubIssuance {
        assignment_id: AssignmentId,
        #[source]
        source: StoreError,
    },
}

/// Tunables for a dispatch attempt
#[derive(Debug, Clone, Copy)]
pub struct DispatchSettings {
    pub max_claim_attempts: usize,
    pub expected_update_margin: Duration,
}

impl From<&Config> for DispatchSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_claim_attempts: config.max_claim_attempts.max(1),
            expected_update_margin: config.expected_update_margin,
        }
    }
}

/// Hands pending assignments to polling clients
pub struct Dispatcher {
    store: Arc<dyn AssignmentStore>,
    policy: PriorityPolicy,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn AssignmentStore>,
        policy: PriorityPolicy,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            store,
            policy,
            settings,
        }
    }

    /// Claim the next run for `platform_id` on behalf of `client_id`.
    ///
    /// `Ok(None)` means no work is available, including when every attempt
    /// lost its claim to a concurrent dispatch.
    pub async fn get_next_run(
        &self,
        platform_id: &str,
        client_id: &str,
    ) -> Result<Option<RunInfo>, DispatchError> {
        let mut tried: Vec<AssignmentId> = Vec::new();

        for attempt in 1..=self.settings.max_claim_attempts {
            let candidates = self
                .store
                .pending_candidates(platform_id, &tried)
                .await
                .map_err(DispatchError::Selection)?;

            let Some(candidate) = select_candidate(candidates, &self.policy) else {
                tracing::debug!(platform_id, client_id, "No pending runs");
                return Ok(None);
            };

            tried.push(candidate.assignment_id);
            let now = Utc::now();

            match claim_assignment(
                self.store.as_ref(),
                candidate.assignment_id,
                platform_id,
                client_id,
                now,
            )
            .await
            {
                Ok(true) => return self.issue(candidate, client_id).await.map(Some),
                Ok(false) => {
                    tracing::debug!(
                        attempt,
                        assignment_id = candidate.assignment_id,
                        "Lost claim race, selecting again"
                    );
                }
                Err(err) => {
                    // Row state is unaffected by a failed conditional update.
                    tracing::warn!(
                        attempt,
                        assignment_id = candidate.assignment_id,
                        "Claim write failed, treating as contention: {}",
                        err
                    );
                }
            }
        }

        tracing::info!(
            platform_id,
            client_id,
            attempts = self.settings.max_claim_attempts,
            "Claim attempts exhausted, reporting no work"
        );

        Ok(None)
    }

    async fn issue(&self, claimed: Candidate, client_id: &str) -> Result<RunInfo, DispatchError> {
        let now = Utc::now();

        match issue_result_stub(
            self.store.as_ref(),
            &claimed,
            client_id,
            self.settings.expected_update_margin,
            now,
        )
        .await
        {
            Ok(issued) => {
                tracing::info!(
                    assignment_id = claimed.assignment_id,
                    run_id = %claimed.run_id,
                    client_id,
                    "Run dispatched"
                );

                Ok(RunInfo {
                    id: claimed.assignment_id,
                    run_id: claimed.run_id,
                    url: claimed.url.clone(),
                    desc: claimed.description(),
                    results_id: issued.stub_id,
                    results_store_token: issued.credential,
                })
            }
            Err(source) => {
                tracing::error!(
                    assignment_id = claimed.assignment_id,
                    client_id,
                    "Claimed assignment left without result stub: {}",
                    source
                );

                if let Err(err) = self.store.flag_orphaned(claimed.assignment_id, now).await {
                    tracing::error!(
                        assignment_id = claimed.assignment_id,
                        "Failed to flag orphaned claim: {}",
                        err
                    );
                }

                Err(DispatchError::StubIssuance {
                    assignment_id: claimed.assignment_id,
                    source,
                })
            }
        }
    }

    /// Count claimed assignments that never received a result stub
    pub async fn count_orphans(&self) -> Result<u64, StoreError> {
        self.store.count_orphaned().await
    }

    /// Like [`Dispatcher::count_orphans`], warning when any exist
    pub async fn report_orphans(&self) -> Result<u64, StoreError> {
        let count = self.count_orphans().await?;

        if count > 0 {
            tracing::warn!("{} claimed assignment(s) have no result stub", count);
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MemoryAssignmentStore, NewResultStub};
    use crate::service::credential::verify_credential;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use swarm_core::domain::assignment::AssignmentStatus;
    use swarm_core::domain::result_stub::ResultStubId;
    use uuid::Uuid;

    const PLATFORM: &str = "firefox-120";

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
    }

    fn settings() -> DispatchSettings {
        DispatchSettings {
            max_claim_attempts: 3,
            expected_update_margin: Duration::from_secs(60),
        }
    }

    fn dispatcher(store: Arc<dyn AssignmentStore>, priority: Option<Uuid>) -> Dispatcher {
        Dispatcher::new(store, PriorityPolicy::new(priority), settings())
    }

    fn seed(
        store: &MemoryAssignmentStore,
        owner: Uuid,
        run_name: &str,
        updated: DateTime<Utc>,
    ) -> AssignmentId {
        let job = store.add_job(owner, "suite").unwrap();
        let run = store
            .add_run(job, run_name, &format!("http://swarm.test/{}", run_name))
            .unwrap();
        store.add_assignment(run, PLATFORM, updated).unwrap()
    }

    #[tokio::test]
    async fn test_no_pending_work_is_not_an_error() {
        let store = Arc::new(MemoryAssignmentStore::new());
        let dispatcher = dispatcher(store, None);

        let run = dispatcher.get_next_run(PLATFORM, "c1").await.unwrap();
        assert!(run.is_none());
    }

    #[tokio::test]
    async fn test_other_platforms_work_is_invisible() {
        let store = Arc::new(MemoryAssignmentStore::new());
        seed(&store, Uuid::new_v4(), "core", at(9, 0));
        let dispatcher = dispatcher(store, None);

        assert!(dispatcher.get_next_run("chrome-118", "c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_priority_account_preempts_then_fairness_resumes() {
        let store = Arc::new(MemoryAssignmentStore::new());
        let ci = Uuid::new_v4();
        let ordinary = Uuid::new_v4();
        let ci_assignment = seed(&store, ci, "ci-run", at(10, 0));
        let ordinary_assignment = seed(&store, ordinary, "user-run", at(9, 0));
        let dispatcher = dispatcher(store.clone(), Some(ci));

        let first = dispatcher.get_next_run(PLATFORM, "c1").await.unwrap().unwrap();
        assert_eq!(first.id, ci_assignment);
        assert_eq!(first.desc, "suite ci-run");

        let second = dispatcher.get_next_run(PLATFORM, "c2").await.unwrap().unwrap();
        assert_eq!(second.id, ordinary_assignment);

        assert!(dispatcher.get_next_run(PLATFORM, "c3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_least_recently_served_user_goes_first() {
        let store = Arc::new(MemoryAssignmentStore::new());
        let recent = Uuid::new_v4();
        let starved = Uuid::new_v4();
        seed(&store, recent, "recent", at(11, 0));
        let starved_assignment = seed(&store, starved, "starved", at(8, 0));
        let dispatcher = dispatcher(store, None);

        let run = dispatcher.get_next_run(PLATFORM, "c1").await.unwrap().unwrap();
        assert_eq!(run.id, starved_assignment);
    }

    #[tokio::test]
    async fn test_serving_a_user_moves_them_to_the_back() {
        let store = Arc::new(MemoryAssignmentStore::new());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        seed(&store, a, "a1", at(8, 0));
        seed(&store, a, "a2", at(8, 0));
        seed(&store, b, "b1", at(9, 0));
        let dispatcher = dispatcher(store.clone(), None);

        let first = dispatcher.get_next_run(PLATFORM, "c1").await.unwrap().unwrap();
        let second = dispatcher.get_next_run(PLATFORM, "c1").await.unwrap().unwrap();
        let third = dispatcher.get_next_run(PLATFORM, "c1").await.unwrap().unwrap();

        // `a` was served at claim time, so `b` now has the older activity.
        assert_eq!(first.desc, "suite a2");
        assert_eq!(second.desc, "suite b1");
        assert_eq!(third.desc, "suite a1");
    }

    #[tokio::test]
    async fn test_dispatch_claims_and_issues_verifiable_credential() {
        let store = Arc::new(MemoryAssignmentStore::new());
        let id = seed(&store, Uuid::new_v4(), "events", at(9, 0));
        let dispatcher = dispatcher(store.clone(), None);

        let run = dispatcher.get_next_run(PLATFORM, "c1").await.unwrap().unwrap();
        assert_eq!(run.url, "http://swarm.test/events");

        let assignment = store.assignment(id).unwrap();
        assert_eq!(assignment.status, AssignmentStatus::Claimed);
        assert_eq!(assignment.result_stub_id, Some(run.results_id));

        let stubs = store.result_stubs_for(id);
        assert_eq!(stubs.len(), 1);
        assert_ne!(stubs[0].credential_hash, run.results_store_token);
        assert!(verify_credential(&run.results_store_token, &stubs[0].credential_hash));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_dispatch_claims_single_assignment_once() {
        let store = Arc::new(MemoryAssignmentStore::new());
        let id = seed(&store, Uuid::new_v4(), "only", at(9, 0));
        let dispatcher = Arc::new(dispatcher(store.clone(), None));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move {
                    dispatcher
                        .get_next_run(PLATFORM, &format!("client-{}", i))
                        .await
                })
            })
            .collect();

        let mut winners = Vec::new();
        for handle in handles {
            if let Some(run) = handle.await.unwrap().unwrap() {
                winners.push(run);
            }
        }

        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].id, id);
        assert_eq!(store.result_stubs_for(id).len(), 1);
        assert_eq!(store.assignment(id).unwrap().status, AssignmentStatus::Claimed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_dispatch_hands_out_distinct_assignments() {
        let store = Arc::new(MemoryAssignmentStore::new());
        let owner = Uuid::new_v4();
        let seeded: HashSet<AssignmentId> = (0..5)
            .map(|i| seed(&store, owner, &format!("run-{}", i), at(9, i)))
            .collect();
        let dispatcher = Arc::new(Dispatcher::new(
            store.clone(),
            PriorityPolicy::default(),
            DispatchSettings {
                max_claim_attempts: 10,
                expected_update_margin: Duration::from_secs(60),
            },
        ));

        let handles: Vec<_> = (0..5)
            .map(|i| {
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move {
                    dispatcher
                        .get_next_run(PLATFORM, &format!("client-{}", i))
                        .await
                })
            })
            .collect();

        let mut served = HashSet::new();
        for handle in handles {
            if let Some(run) = handle.await.unwrap().unwrap() {
                assert!(served.insert(run.id), "assignment {} dispatched twice", run.id);
            }
        }

        assert_eq!(served, seeded);
        for id in &served {
            assert_eq!(store.result_stubs_for(*id).len(), 1);
        }
    }

    /// Lets another dispatcher win the first claim it sees.
    struct RacingStore {
        inner: MemoryAssignmentStore,
        raced: AtomicBool,
    }

    #[async_trait]
    impl AssignmentStore for RacingStore {
        async fn pending_candidates(
            &self,
            platform_id: &str,
            exclude: &[AssignmentId],
        ) -> crate::repository::assignment::Result<Vec<Candidate>> {
            self.inner.pending_candidates(platform_id, exclude).await
        }

        async fn try_claim(
            &self,
            assignment_id: AssignmentId,
            platform_id: &str,
            client_id: &str,
            now: DateTime<Utc>,
        ) -> crate::repository::assignment::Result<bool> {
            if !self.raced.swap(true, Ordering::SeqCst) {
                self.inner
                    .try_claim(assignment_id, platform_id, "rival", now)
                    .await?;
            }
            self.inner
                .try_claim(assignment_id, platform_id, client_id, now)
                .await
        }

        async fn insert_result_stub(
            &self,
            stub: NewResultStub,
        ) -> crate::repository::assignment::Result<ResultStubId> {
            self.inner.insert_result_stub(stub).await
        }

        async fn flag_orphaned(
            &self,
            assignment_id: AssignmentId,
            now: DateTime<Utc>,
        ) -> crate::repository::assignment::Result<()> {
            self.inner.flag_orphaned(assignment_id, now).await
        }

        async fn count_orphaned(&self) -> crate::repository::assignment::Result<u64> {
            self.inner.count_orphaned().await
        }
    }

    #[tokio::test]
    async fn test_lost_race_retries_with_next_candidate() {
        let inner = MemoryAssignmentStore::new();
        let owner = Uuid::new_v4();
        let older = seed(&inner, owner, "older", at(9, 0));
        let newer = seed(&inner, owner, "newer", at(9, 5));
        let store = Arc::new(RacingStore {
            inner,
            raced: AtomicBool::new(false),
        });
        let dispatcher = dispatcher(store.clone(), None);

        let run = dispatcher.get_next_run(PLATFORM, "c1").await.unwrap().unwrap();

        // The newest assignment went to the rival; we got the other one.
        assert_eq!(run.id, older);
        let lost = store.inner.assignment(newer).unwrap();
        assert_eq!(lost.claimed_by.as_deref(), Some("rival"));
        assert!(store.inner.result_stubs_for(newer).is_empty());
    }

    #[tokio::test]
    async fn test_lost_race_on_last_candidate_reports_no_work() {
        let inner = MemoryAssignmentStore::new();
        seed(&inner, Uuid::new_v4(), "solo", at(9, 0));
        let store = Arc::new(RacingStore {
            inner,
            raced: AtomicBool::new(false),
        });
        let dispatcher = dispatcher(store, None);

        assert!(dispatcher.get_next_run(PLATFORM, "c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failing_claim_writes_converge_to_no_work() {
        let store = Arc::new(MemoryAssignmentStore::new());
        let id = seed(&store, Uuid::new_v4(), "flaky", at(9, 0));
        store.set_fail_claims(true);
        let dispatcher = dispatcher(store.clone(), None);

        assert!(dispatcher.get_next_run(PLATFORM, "c1").await.unwrap().is_none());
        assert_eq!(store.assignment(id).unwrap().status, AssignmentStatus::Pending);
    }

    #[tokio::test]
    async fn test_stub_failure_surfaces_and_flags_orphan() {
        let store = Arc::new(MemoryAssignmentStore::new());
        let id = seed(&store, Uuid::new_v4(), "orphan", at(9, 0));
        store.set_fail_stub_inserts(true);
        let dispatcher = dispatcher(store.clone(), None);

        let err = dispatcher.get_next_run(PLATFORM, "c1").await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::StubIssuance { assignment_id, .. } if assignment_id == id
        ));

        let assignment = store.assignment(id).unwrap();
        assert_eq!(assignment.status, AssignmentStatus::Claimed);
        assert!(assignment.result_stub_id.is_none());
        assert!(assignment.orphaned_at.is_some());
        assert_eq!(dispatcher.report_orphans().await.unwrap(), 1);

        // The orphan is not handed out again.
        store.set_fail_stub_inserts(false);
        assert!(dispatcher.get_next_run(PLATFORM, "c2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreadable_store_is_a_selection_failure() {
        let store = Arc::new(MemoryAssignmentStore::new());
        seed(&store, Uuid::new_v4(), "core", at(9, 0));
        store.set_fail_reads(true);
        let dispatcher = dispatcher(store, None);

        let err = dispatcher.get_next_run(PLATFORM, "c1").await.unwrap_err();
        assert!(matches!(err, DispatchError::Selection(_)));
        assert!(dispatcher.count_orphans().await.is_err());
    }

    #[test]
    fn test_settings_from_config_clamp_attempts() {
        let config = Config {
            max_claim_attempts: 0,
            ..Config::default()
        };
        let settings = DispatchSettings::from(&config);
        assert_eq!(settings.max_claim_attempts, 1);
        assert_eq!(settings.expected_update_margin, config.expected_update_margin);
    }
}
