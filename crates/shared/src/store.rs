//! Agent store abstraction
//!
//! The core is agnostic about where agent records live: `MemoryAgentStore`
//! keeps them in-process, `db::PgAgentStore` persists them in Postgres.
//! Both enforce the same contract, most importantly agent-code uniqueness
//! on create.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::error::WallboardError;
use crate::types::{Agent, AgentFilter, AgentId, AgentUpdate, NewAgent};

/// Key-value persistence over agent records
#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn get(&self, id: AgentId) -> Result<Agent, WallboardError>;

    async fn get_by_code(&self, code: &str) -> Result<Agent, WallboardError>;

    async fn list(&self, filter: &AgentFilter) -> Result<Vec<Agent>, WallboardError>;

    /// Create a new record; fails with `DuplicateCode` on a code collision
    async fn create(&self, new_agent: NewAgent) -> Result<Agent, WallboardError>;

    async fn update(&self, id: AgentId, update: AgentUpdate) -> Result<Agent, WallboardError>;

    async fn delete(&self, id: AgentId) -> Result<(), WallboardError>;

    /// Backend health probe for readiness checks
    async fn ping(&self) -> Result<(), WallboardError>;
}

/// In-memory agent store
///
/// A single map lock gives readers a consistent point-in-time view; no
/// partially-updated record is ever observable.
#[derive(Default)]
pub struct MemoryAgentStore {
    agents: RwLock<HashMap<AgentId, Agent>>,
}

impl MemoryAgentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentStore for MemoryAgentStore {
    async fn get(&self, id: AgentId) -> Result<Agent, WallboardError> {
        let agents = self.agents.read().await;
        agents.get(&id).cloned().ok_or(WallboardError::NotFound)
    }

    async fn get_by_code(&self, code: &str) -> Result<Agent, WallboardError> {
        let agents = self.agents.read().await;
        agents
            .values()
            .find(|a| a.agent_code == code)
            .cloned()
            .ok_or(WallboardError::NotFound)
    }

    async fn list(&self, filter: &AgentFilter) -> Result<Vec<Agent>, WallboardError> {
        let agents = self.agents.read().await;
        let mut matched: Vec<Agent> = agents
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.agent_code.cmp(&b.agent_code));
        Ok(matched)
    }

    async fn create(&self, new_agent: NewAgent) -> Result<Agent, WallboardError> {
        let mut agents = self.agents.write().await;
        if agents
            .values()
            .any(|a| a.agent_code == new_agent.agent_code)
        {
            return Err(WallboardError::DuplicateCode(new_agent.agent_code));
        }

        let now = OffsetDateTime::now_utc();
        let agent = Agent {
            id: AgentId::new(),
            agent_code: new_agent.agent_code,
            name: new_agent.name,
            email: new_agent.email,
            department: new_agent.department,
            skills: new_agent.skills,
            status: new_agent.status,
            is_online: false,
            connection_ref: None,
            login_time: None,
            last_status_change: None,
            created_at: now,
            updated_at: now,
        };
        agents.insert(agent.id, agent.clone());
        Ok(agent)
    }

    async fn update(&self, id: AgentId, update: AgentUpdate) -> Result<Agent, WallboardError> {
        let mut agents = self.agents.write().await;
        let agent = agents.get_mut(&id).ok_or(WallboardError::NotFound)?;
        update.apply(agent);
        Ok(agent.clone())
    }

    async fn delete(&self, id: AgentId) -> Result<(), WallboardError> {
        let mut agents = self.agents.write().await;
        agents.remove(&id).map(|_| ()).ok_or(WallboardError::NotFound)
    }

    async fn ping(&self) -> Result<(), WallboardError> {
        Ok(())
    }
}
