//! Client Repository
//!
//! Handles all database operations related to worker clients.

use sqlx::PgPool;
use swarm_core::domain::client::Client;
use swarm_core::dto::client::RegisterClient;

/// Create or update a client registration in the database
pub async fn register(pool: &PgPool, req: RegisterClient) -> Result<Client, sqlx::Error> {
    let now = chrono::Utc::now();

    let row = sqlx::query_as::<_, ClientRow>(
        r#"
        INSERT INTO clients (id, name, platform_id, registered_at, last_seen_at)
        VALUES ($1, $2, $3, $4, $4)
        ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            platform_id = EXCLUDED.platform_id,
            last_seen_at = EXCLUDED.last_seen_at
        RETURNING id, name, platform_id, registered_at, last_seen_at
        "#,
    )
    .bind(&req.client_id)
    .bind(&req.name)
    .bind(&req.platform_id)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(row.into())
}

/// Refresh the aliveness timestamp of a client
pub async fn touch(pool: &PgPool, client_id: &str) -> Result<bool, sqlx::Error> {
    let now = chrono::Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE clients
        SET last_seen_at = $1
        WHERE id = $2
        "#,
    )
    .bind(now)
    .bind(client_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Find a client by ID
pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Client>, sqlx::Error> {
    let row = sqlx::query_as::<_, ClientRow>(
        r#"
        SELECT id, name, platform_id, registered_at, last_seen_at
        FROM clients
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ClientRow {
    id: String,
    name: String,
    platform_id: String,
    registered_at: chrono::DateTime<chrono::Utc>,
    last_seen_at: chrono::DateTime<chrono::Utc>,
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            id: row.id,
            name: row.name,
            platform_id: row.platform_id,
            registered_at: row.registered_at,
            last_seen_at: row.last_seen_at,
        }
    }
}
