//! Postgres Assignment Store
//!
//! sqlx-backed implementation of [`AssignmentStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use swarm_core::domain::assignment::{AssignmentId, AssignmentStatus};
use swarm_core::domain::result_stub::ResultStubId;
use uuid::Uuid;

use super::assignment::{AssignmentStore, Candidate, NewResultStub, Result, StoreError};

/// Assignment store backed by the orchestrator's Postgres pool
#[derive(Debug, Clone)]
pub struct PgAssignmentStore {
    pool: PgPool,
}

impl PgAssignmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssignmentStore for PgAssignmentStore {
    async fn pending_candidates(
        &self,
        platform_id: &str,
        exclude: &[AssignmentId],
    ) -> Result<Vec<Candidate>> {
        // Owner activity spans every status so recently served owners sort last.
        let rows = sqlx::query_as::<_, CandidateRow>(
            r#"
            WITH activity AS (
                SELECT jobs.owner_id, MAX(assignments.updated_at) AS last_activity
                FROM assignments
                INNER JOIN runs ON runs.id = assignments.run_id
                INNER JOIN jobs ON jobs.id = runs.job_id
                WHERE assignments.platform_id = $1
                GROUP BY jobs.owner_id
            )
            SELECT DISTINCT ON (jobs.owner_id)
                   assignments.id AS assignment_id,
                   assignments.run_id,
                   jobs.owner_id,
                   activity.last_activity AS owner_last_activity,
                   assignments.created_at,
                   runs.url,
                   jobs.name AS job_name,
                   runs.name AS run_name
            FROM assignments
            INNER JOIN runs ON runs.id = assignments.run_id
            INNER JOIN jobs ON jobs.id = runs.job_id
            INNER JOIN activity ON activity.owner_id = jobs.owner_id
            WHERE assignments.platform_id = $1
              AND assignments.status = $2
              AND NOT (assignments.id = ANY($3))
            ORDER BY jobs.owner_id, assignments.created_at DESC, assignments.id DESC
            "#,
        )
        .bind(platform_id)
        .bind(AssignmentStatus::Pending.as_str())
        .bind(exclude)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn try_claim(
        &self,
        assignment_id: AssignmentId,
        platform_id: &str,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE assignments
            SET status = $1, updated_at = $2, claimed_at = $2, claimed_by = $3
            WHERE id = $4 AND platform_id = $5 AND status = $6
            "#,
        )
        .bind(AssignmentStatus::Claimed.as_str())
        .bind(now)
        .bind(client_id)
        .bind(assignment_id)
        .bind(platform_id)
        .bind(AssignmentStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_result_stub(&self, stub: NewResultStub) -> Result<ResultStubId> {
        let mut tx = self.pool.begin().await?;

        let (stub_id,): (ResultStubId,) = sqlx::query_as(
            r#"
            INSERT INTO result_stubs
                (assignment_id, run_id, client_id, credential_hash, created_at, updated_at, expected_update_at)
            VALUES ($1, $2, $3, $4, $5, $5, $6)
            RETURNING id
            "#,
        )
        .bind(stub.assignment_id)
        .bind(stub.run_id)
        .bind(&stub.client_id)
        .bind(&stub.credential_hash)
        .bind(stub.created_at)
        .bind(stub.expected_update_at)
        .fetch_one(&mut *tx)
        .await?;

        let linked = sqlx::query(
            r#"
            UPDATE assignments
            SET result_stub_id = $1
            WHERE id = $2 AND status = $3 AND result_stub_id IS NULL
            "#,
        )
        .bind(stub_id)
        .bind(stub.assignment_id)
        .bind(AssignmentStatus::Claimed.as_str())
        .execute(&mut *tx)
        .await?;

        if linked.rows_affected() != 1 {
            // Dropping the transaction rolls back the stub insert.
            return Err(StoreError::NotClaimed(stub.assignment_id));
        }

        tx.commit().await?;

        Ok(stub_id)
    }

    async fn flag_orphaned(&self, assignment_id: AssignmentId, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE assignments
            SET orphaned_at = $1
            WHERE id = $2 AND status = $3 AND result_stub_id IS NULL
            "#,
        )
        .bind(now)
        .bind(assignment_id)
        .bind(AssignmentStatus::Claimed.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_orphaned(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM assignments
            WHERE status = $1 AND orphaned_at IS NOT NULL AND result_stub_id IS NULL
            "#,
        )
        .bind(AssignmentStatus::Claimed.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct CandidateRow {
    assignment_id: i64,
    run_id: Uuid,
    owner_id: Uuid,
    owner_last_activity: DateTime<Utc>,
    created_at: DateTime<Utc>,
    url: String,
    job_name: String,
    run_name: String,
}

impl From<CandidateRow> for Candidate {
    fn from(row: CandidateRow) -> Self {
        Candidate {
            assignment_id: row.assignment_id,
            run_id: row.run_id,
            owner_id: row.owner_id,
            owner_last_activity: row.owner_last_activity,
            created_at: row.created_at,
            url: row.url,
            job_name: row.job_name,
            run_name: row.run_name,
        }
    }
}
