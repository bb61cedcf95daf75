//! Result Stub Issuer
//!
//! Creates the result-tracking record for a freshly claimed assignment and
//! hands back the plaintext credential exactly once.

use chrono::{DateTime, Utc};
use std::time::Duration;
use swarm_core::domain::result_stub::ResultStubId;

use super::credential::generate_credential;
use crate::repository::{AssignmentStore, Candidate, NewResultStub, StoreError};

/// Stub id plus the only copy of its plaintext credential
#[derive(Debug, Clone)]
pub struct IssuedStub {
    pub stub_id: ResultStubId,
    pub credential: String,
}

pub async fn issue_result_stub(
    store: &dyn AssignmentStore,
    claimed: &Candidate,
    client_id: &str,
    grace_margin: Duration,
    now: DateTime<Utc>,
) -> Result<IssuedStub, StoreError> {
    let credential = generate_credential();
    let margin = chrono::Duration::from_std(grace_margin)
        .unwrap_or_else(|_| chrono::Duration::seconds(i64::from(u32::MAX)));

    let stub_id = store
        .insert_result_stub(NewResultStub {
            assignment_id: claimed.assignment_id,
            run_id: claimed.run_id,
            client_id: client_id.to_string(),
            credential_hash: credential.hash,
            created_at: now,
            expected_update_at: now + margin,
        })
        .await?;

    tracing::debug!(
        stub_id,
        assignment_id = claimed.assignment_id,
        "Result stub issued"
    );

    Ok(IssuedStub {
        stub_id,
        credential: credential.plaintext,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryAssignmentStore;
    use crate::service::credential::verify_credential;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_stub_stores_hash_and_deadline() {
        let store = MemoryAssignmentStore::new();
        let job = store.add_job(Uuid::new_v4(), "release").unwrap();
        let run = store.add_run(job, "ajax", "http://swarm.test/ajax").unwrap();
        let id = store.add_assignment(run, "edge", Utc::now()).unwrap();

        let now = Utc::now();
        assert!(store.try_claim(id, "edge", "c9", now).await.unwrap());
        let candidate = store
            .pending_candidates("edge", &[])
            .await
            .unwrap()
            .into_iter()
            .next();
        assert!(candidate.is_none(), "claimed work must leave the snapshot");

        let claimed = Candidate {
            assignment_id: id,
            run_id: run,
            owner_id: Uuid::new_v4(),
            owner_last_activity: now,
            created_at: now,
            url: "http://swarm.test/ajax".to_string(),
            job_name: "release".to_string(),
            run_name: "ajax".to_string(),
        };

        let issued = issue_result_stub(&store, &claimed, "c9", Duration::from_secs(90), now)
            .await
            .unwrap();

        let stubs = store.result_stubs_for(id);
        assert_eq!(stubs.len(), 1);
        let stub = &stubs[0];
        assert_eq!(stub.id, issued.stub_id);
        assert_eq!(stub.client_id, "c9");
        assert_eq!(stub.expected_update_at - stub.created_at, chrono::Duration::seconds(90));
        assert_ne!(stub.credential_hash, issued.credential);
        assert!(verify_credential(&issued.credential, &stub.credential_hash));
    }
}
