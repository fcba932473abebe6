//! Database utilities and the Postgres-backed agent store

use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::WallboardError;
use crate::store::AgentStore;
use crate::types::{Agent, AgentFilter, AgentId, AgentUpdate, ConnectionId, NewAgent, StatusChange};

/// Create a database connection pool
/// Note: Disables statement cache for PgBouncer compatibility
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let options = PgConnectOptions::from_str(database_url)?.statement_cache_capacity(0);

    PgPoolOptions::new()
        .max_connections(5)
        .min_connections(0)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(60))
        .connect_with(options)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

impl From<sqlx::Error> for WallboardError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => WallboardError::NotFound,
            other => WallboardError::Internal(other.to_string()),
        }
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, FromRow)]
struct AgentRow {
    id: Uuid,
    agent_code: String,
    name: String,
    email: Option<String>,
    department: Option<String>,
    skills: Vec<String>,
    status: String,
    is_online: bool,
    connection_ref: Option<Uuid>,
    login_time: Option<OffsetDateTime>,
    last_status_change_at: Option<OffsetDateTime>,
    last_status_reason: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<AgentRow> for Agent {
    fn from(row: AgentRow) -> Self {
        Agent {
            id: AgentId(row.id),
            agent_code: row.agent_code,
            name: row.name,
            email: row.email,
            department: row.department,
            skills: row.skills,
            status: row.status,
            is_online: row.is_online,
            connection_ref: row.connection_ref.map(ConnectionId),
            login_time: row.login_time,
            last_status_change: row.last_status_change_at.map(|timestamp| StatusChange {
                timestamp,
                reason: row.last_status_reason,
            }),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const AGENT_COLUMNS: &str = "id, agent_code, name, email, department, skills, status, \
     is_online, connection_ref, login_time, last_status_change_at, last_status_reason, \
     created_at, updated_at";

// =============================================================================
// Postgres Agent Store
// =============================================================================

/// Postgres-backed agent store
#[derive(Clone)]
pub struct PgAgentStore {
    pool: PgPool,
}

impl PgAgentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgentStore for PgAgentStore {
    async fn get(&self, id: AgentId) -> Result<Agent, WallboardError> {
        let row: Option<AgentRow> = sqlx::query_as(&format!(
            "SELECT {AGENT_COLUMNS} FROM agents WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Agent::from).ok_or(WallboardError::NotFound)
    }

    async fn get_by_code(&self, code: &str) -> Result<Agent, WallboardError> {
        let row: Option<AgentRow> = sqlx::query_as(&format!(
            "SELECT {AGENT_COLUMNS} FROM agents WHERE agent_code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Agent::from).ok_or(WallboardError::NotFound)
    }

    async fn list(&self, filter: &AgentFilter) -> Result<Vec<Agent>, WallboardError> {
        let rows: Vec<AgentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {AGENT_COLUMNS} FROM agents
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR department = $2)
              AND ($3::bool IS NULL OR is_online = $3)
            ORDER BY agent_code
            "#
        ))
        .bind(filter.status.as_deref())
        .bind(filter.department.as_deref())
        .bind(filter.is_online)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Agent::from).collect())
    }

    async fn create(&self, new_agent: NewAgent) -> Result<Agent, WallboardError> {
        let row: Result<AgentRow, sqlx::Error> = sqlx::query_as(&format!(
            r#"
            INSERT INTO agents (id, agent_code, name, email, department, skills, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {AGENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new_agent.agent_code)
        .bind(&new_agent.name)
        .bind(new_agent.email.as_deref())
        .bind(new_agent.department.as_deref())
        .bind(&new_agent.skills)
        .bind(&new_agent.status)
        .fetch_one(&self.pool)
        .await;

        match row {
            Ok(row) => Ok(Agent::from(row)),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
                // PostgreSQL unique violation on agent_code
                Err(WallboardError::DuplicateCode(new_agent.agent_code))
            }
            Err(other) => Err(other.into()),
        }
    }

    async fn update(&self, id: AgentId, update: AgentUpdate) -> Result<Agent, WallboardError> {
        // Read-modify-write; callers serialize mutations per agent, so the
        // full-row update cannot clobber a concurrent change.
        let mut agent = self.get(id).await?;
        update.apply(&mut agent);

        let row: AgentRow = sqlx::query_as(&format!(
            r#"
            UPDATE agents SET
                name = $2,
                email = $3,
                department = $4,
                skills = $5,
                status = $6,
                is_online = $7,
                connection_ref = $8,
                login_time = $9,
                last_status_change_at = $10,
                last_status_reason = $11,
                updated_at = $12
            WHERE id = $1
            RETURNING {AGENT_COLUMNS}
            "#
        ))
        .bind(id.0)
        .bind(&agent.name)
        .bind(agent.email.as_deref())
        .bind(agent.department.as_deref())
        .bind(&agent.skills)
        .bind(&agent.status)
        .bind(agent.is_online)
        .bind(agent.connection_ref.map(|c| c.0))
        .bind(agent.login_time)
        .bind(agent.last_status_change.as_ref().map(|c| c.timestamp))
        .bind(
            agent
                .last_status_change
                .as_ref()
                .and_then(|c| c.reason.as_deref()),
        )
        .bind(agent.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(Agent::from(row))
    }

    async fn delete(&self, id: AgentId) -> Result<(), WallboardError> {
        let result = sqlx::query("DELETE FROM agents WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(WallboardError::NotFound);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), WallboardError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_pg_store_roundtrip() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url).await.expect("Failed to create pool");
        run_migrations(&pool).await.expect("Failed to migrate");

        let store = PgAgentStore::new(pool);
        let agent = store
            .create(NewAgent {
                agent_code: format!("T{}", Uuid::new_v4().simple()),
                name: "Test Agent".to_string(),
                email: None,
                department: None,
                skills: vec!["english".to_string()],
                status: "Offline".to_string(),
            })
            .await
            .expect("Failed to create agent");

        let fetched = store.get(agent.id).await.expect("Failed to fetch agent");
        assert_eq!(fetched.agent_code, agent.agent_code);

        store.delete(agent.id).await.expect("Failed to delete agent");
    }
}
