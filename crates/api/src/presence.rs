//! Connection-presence synchronization
//!
//! The presence registry is the only owner of the connection -> agent
//! mapping. It mirrors live socket sessions into the persisted agent
//! records: login binds a connection and marks the agent online, logout or
//! socket close forces the agent offline. All mutations for one agent are
//! serialized through a per-agent-code lock; different agents proceed
//! concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use wallboard_shared::{
    Agent, AgentId, AgentStore, AgentUpdate, ConnectionId, StatusChange, StatusWorkflow,
    WallboardError,
};

use crate::dashboard::DashboardAggregator;
use crate::websocket::connection::Connection;
use crate::websocket::events::ServerEvent;
use crate::websocket::topics::{EventBroadcaster, Topic};

/// Per-agent-code mutation locks
///
/// Shared by the presence registry and the status transition engine so
/// that no presence update and status transition interleave for the same
/// agent.
#[derive(Default)]
pub struct AgentLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AgentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the mutation lock for one agent code
    pub async fn acquire(&self, agent_code: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().await;
            Arc::clone(
                locks
                    .entry(agent_code.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}

/// A live connection bound to an agent identity
#[derive(Debug, Clone)]
pub struct Session {
    pub agent_id: AgentId,
    pub agent_code: String,
    pub agent_name: String,
    pub login_time: OffsetDateTime,
}

#[derive(Default)]
struct Bindings {
    sessions: HashMap<ConnectionId, Session>,
    by_code: HashMap<String, ConnectionId>,
}

/// Maps live connection identifiers to agent identity
pub struct PresenceRegistry {
    bindings: RwLock<Bindings>,
    store: Arc<dyn AgentStore>,
    workflow: Arc<StatusWorkflow>,
    broadcaster: Arc<EventBroadcaster>,
    aggregator: Arc<DashboardAggregator>,
    locks: Arc<AgentLocks>,
}

impl PresenceRegistry {
    pub fn new(
        store: Arc<dyn AgentStore>,
        workflow: Arc<StatusWorkflow>,
        broadcaster: Arc<EventBroadcaster>,
        aggregator: Arc<DashboardAggregator>,
        locks: Arc<AgentLocks>,
    ) -> Self {
        Self {
            bindings: RwLock::new(Bindings::default()),
            store,
            workflow,
            broadcaster,
            aggregator,
            locks,
        }
    }

    /// Bind a connection to an agent and mark the agent online
    ///
    /// Fails with `NotFound` (no side effects, no registry entry) when the
    /// agent code is unknown; a store failure likewise leaves the registry
    /// untouched. An existing live binding for the same code is silently
    /// superseded: its entry is dropped without an `agent-offline` event,
    /// and its later disconnect is a no-op.
    pub async fn on_login(
        &self,
        connection_id: ConnectionId,
        agent_code: &str,
        agent_name: &str,
    ) -> Result<Agent, WallboardError> {
        let _guard = self.locks.acquire(agent_code).await;

        let agent = self.store.get_by_code(agent_code).await?;
        let now = OffsetDateTime::now_utc();

        // Store write first: on failure the connection is never registered.
        let updated = self
            .store
            .update(
                agent.id,
                AgentUpdate {
                    is_online: Some(true),
                    connection_ref: Some(Some(connection_id)),
                    login_time: Some(Some(now)),
                    ..Default::default()
                },
            )
            .await?;

        {
            let mut bindings = self.bindings.write().await;
            if let Some(superseded) = bindings
                .by_code
                .insert(agent_code.to_string(), connection_id)
            {
                bindings.sessions.remove(&superseded);
                tracing::info!(
                    agent_code = %agent_code,
                    superseded = %superseded,
                    connection_id = %connection_id,
                    "Previous connection superseded by new login"
                );
            }
            bindings.sessions.insert(
                connection_id,
                Session {
                    agent_id: agent.id,
                    agent_code: agent_code.to_string(),
                    agent_name: agent_name.to_string(),
                    login_time: now,
                },
            );
        }

        self.broadcaster
            .publish(
                &Topic::All,
                ServerEvent::AgentOnline {
                    agent_code: agent_code.to_string(),
                    agent_name: agent_name.to_string(),
                    timestamp: now,
                },
            )
            .await;
        self.aggregator.push_update().await;

        tracing::info!(agent_code = %agent_code, connection_id = %connection_id, "Agent logged in");
        Ok(updated)
    }

    /// Unbind a connection, forcing its agent offline
    ///
    /// Idempotent: a connection with no current binding (never logged in,
    /// already cleaned up, or superseded by a later login) is a successful
    /// no-op and emits nothing. The offline status bypasses the transition
    /// graph; disconnect always wins.
    pub async fn on_disconnect(&self, connection_id: ConnectionId) -> Result<(), WallboardError> {
        let session = {
            let bindings = self.bindings.read().await;
            match bindings.sessions.get(&connection_id) {
                Some(session) => session.clone(),
                None => return Ok(()),
            }
        };

        let _guard = self.locks.acquire(&session.agent_code).await;

        // Re-check under the lock: a concurrent login may have superseded
        // this connection between the read above and lock acquisition.
        {
            let bindings = self.bindings.read().await;
            if !bindings.sessions.contains_key(&connection_id) {
                return Ok(());
            }
        }

        let now = OffsetDateTime::now_utc();
        let result = self
            .store
            .update(
                session.agent_id,
                AgentUpdate {
                    is_online: Some(false),
                    connection_ref: Some(None),
                    status: Some(self.workflow.offline().to_string()),
                    last_status_change: Some(StatusChange {
                        timestamp: now,
                        reason: Some("disconnected".to_string()),
                    }),
                    ..Default::default()
                },
            )
            .await;

        match result {
            Ok(_) => {}
            // Record deleted while the connection was live: just drop the binding.
            Err(WallboardError::NotFound) => {
                self.unbind(connection_id, &session.agent_code).await;
                return Ok(());
            }
            Err(other) => return Err(other),
        }

        self.unbind(connection_id, &session.agent_code).await;

        self.broadcaster
            .publish(
                &Topic::All,
                ServerEvent::AgentOffline {
                    agent_code: session.agent_code.clone(),
                    agent_name: session.agent_name.clone(),
                    timestamp: now,
                },
            )
            .await;
        self.aggregator.push_update().await;

        tracing::info!(
            agent_code = %session.agent_code,
            connection_id = %connection_id,
            "Agent disconnected and marked offline"
        );
        Ok(())
    }

    /// Subscribe a connection to the dashboard topic and push an immediate
    /// snapshot to it
    pub async fn on_join_dashboard(&self, conn: Arc<Connection>) {
        self.broadcaster.join(&Topic::Dashboard, Arc::clone(&conn)).await;
        self.aggregator.push_to(&conn).await;
        tracing::debug!(connection_id = %conn.connection_id, "Connection joined dashboard");
    }

    /// Drop any binding for an agent without emitting events
    ///
    /// Used when the agent record itself is deleted.
    pub async fn forget_agent(&self, agent_code: &str) {
        let _guard = self.locks.acquire(agent_code).await;
        let mut bindings = self.bindings.write().await;
        if let Some(connection_id) = bindings.by_code.remove(agent_code) {
            bindings.sessions.remove(&connection_id);
        }
    }

    /// The session bound to a connection, if any
    pub async fn session_for(&self, connection_id: ConnectionId) -> Option<Session> {
        self.bindings.read().await.sessions.get(&connection_id).cloned()
    }

    /// The connection currently bound to an agent code, if any
    pub async fn agent_connection(&self, agent_code: &str) -> Option<ConnectionId> {
        self.bindings.read().await.by_code.get(agent_code).copied()
    }

    /// Number of live agent bindings
    pub async fn session_count(&self) -> usize {
        self.bindings.read().await.sessions.len()
    }

    async fn unbind(&self, connection_id: ConnectionId, agent_code: &str) {
        let mut bindings = self.bindings.write().await;
        bindings.sessions.remove(&connection_id);
        if bindings.by_code.get(agent_code) == Some(&connection_id) {
            bindings.by_code.remove(agent_code);
        }
    }
}
