//! Status transition engine
//!
//! Validates status changes against the configured transition graph and
//! applies them atomically, sharing the per-agent locks with the presence
//! registry so no transition interleaves with a presence update for the
//! same agent.

use std::sync::Arc;

use time::OffsetDateTime;
use wallboard_shared::{
    Agent, AgentId, AgentStore, AgentUpdate, StatusChange, StatusWorkflow, WallboardError,
};

use crate::presence::AgentLocks;
use crate::websocket::events::ServerEvent;
use crate::websocket::topics::{EventBroadcaster, Topic};

/// Validates and applies status changes
pub struct StatusEngine {
    store: Arc<dyn AgentStore>,
    workflow: Arc<StatusWorkflow>,
    broadcaster: Arc<EventBroadcaster>,
    locks: Arc<AgentLocks>,
}

impl StatusEngine {
    pub fn new(
        store: Arc<dyn AgentStore>,
        workflow: Arc<StatusWorkflow>,
        broadcaster: Arc<EventBroadcaster>,
        locks: Arc<AgentLocks>,
    ) -> Self {
        Self {
            store,
            workflow,
            broadcaster,
            locks,
        }
    }

    /// Apply a status transition
    ///
    /// Fails with `NotFound` for an unknown agent, `InvalidStatus` for a
    /// target outside the enumeration, and `IllegalTransition` (carrying
    /// the allowed next states) for a non-edge; none of these mutate
    /// state. On success the agent's status, `last_status_change`, and
    /// `updated_at` change together and an `agentStatusChanged` event is
    /// broadcast.
    pub async fn transition(
        &self,
        agent_id: AgentId,
        target: &str,
        reason: Option<String>,
    ) -> Result<Agent, WallboardError> {
        let agent = self.store.get(agent_id).await?;
        let _guard = self.locks.acquire(&agent.agent_code).await;

        // Re-read under the lock; the status may have moved while waiting.
        let agent = self.store.get(agent_id).await?;
        self.workflow.ensure_transition(&agent.status, target)?;

        let updated = self
            .store
            .update(
                agent_id,
                AgentUpdate {
                    status: Some(target.to_string()),
                    last_status_change: Some(StatusChange {
                        timestamp: OffsetDateTime::now_utc(),
                        reason,
                    }),
                    ..Default::default()
                },
            )
            .await?;

        self.broadcaster
            .publish(
                &Topic::All,
                ServerEvent::AgentStatusChanged {
                    id: updated.id,
                    agent_code: updated.agent_code.clone(),
                    status: updated.status.clone(),
                    last_status_change: updated.last_status_change.clone(),
                },
            )
            .await;

        tracing::info!(
            agent_code = %updated.agent_code,
            from = %agent.status,
            to = %target,
            "Agent status updated"
        );
        Ok(updated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Allow unwrap() in tests for cleaner test code
mod tests {
    use super::*;
    use crate::websocket::connection::Connection;
    use tokio::sync::mpsc;
    use wallboard_shared::{MemoryAgentStore, NewAgent};

    struct Harness {
        engine: StatusEngine,
        store: Arc<dyn AgentStore>,
        broadcaster: Arc<EventBroadcaster>,
    }

    async fn harness() -> (Harness, Agent) {
        let store: Arc<dyn AgentStore> = Arc::new(MemoryAgentStore::new());
        let broadcaster = Arc::new(EventBroadcaster::new());
        let engine = StatusEngine::new(
            Arc::clone(&store),
            Arc::new(StatusWorkflow::default()),
            Arc::clone(&broadcaster),
            Arc::new(AgentLocks::new()),
        );

        let agent = store
            .create(NewAgent {
                agent_code: "A001".to_string(),
                name: "Alice".to_string(),
                email: None,
                department: None,
                skills: vec![],
                status: "Offline".to_string(),
            })
            .await
            .unwrap();

        (
            Harness {
                engine,
                store,
                broadcaster,
            },
            agent,
        )
    }

    #[tokio::test]
    async fn test_allowed_transition_updates_and_broadcasts() {
        let (h, agent) = harness().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        h.broadcaster.add_connection(Connection::new(tx)).await;

        let updated = h
            .engine
            .transition(agent.id, "Available", Some("shift start".to_string()))
            .await
            .unwrap();

        assert_eq!(updated.status, "Available");
        let change = updated.last_status_change.unwrap();
        assert_eq!(change.reason.as_deref(), Some("shift start"));
        assert!(updated.updated_at >= agent.updated_at);

        match rx.try_recv().unwrap() {
            ServerEvent::AgentStatusChanged {
                agent_code, status, ..
            } => {
                assert_eq!(agent_code, "A001");
                assert_eq!(status, "Available");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_illegal_transition_leaves_state_untouched() {
        let (h, agent) = harness().await;
        h.engine
            .transition(agent.id, "Available", None)
            .await
            .unwrap();

        // Available -> Offline is not an edge of the default graph
        let err = h
            .engine
            .transition(agent.id, "Offline", None)
            .await
            .unwrap_err();

        match err {
            WallboardError::IllegalTransition { from, to, allowed } => {
                assert_eq!(from, "Available");
                assert_eq!(to, "Offline");
                assert!(allowed.contains(&"Busy".to_string()));
            }
            other => panic!("expected IllegalTransition, got {other:?}"),
        }

        let current = h.store.get(agent.id).await.unwrap();
        assert_eq!(current.status, "Available");
    }

    #[tokio::test]
    async fn test_invalid_status_rejected() {
        let (h, agent) = harness().await;
        let err = h.engine.transition(agent.id, "Lunch", None).await.unwrap_err();
        assert!(matches!(err, WallboardError::InvalidStatus(s) if s == "Lunch"));

        let current = h.store.get(agent.id).await.unwrap();
        assert_eq!(current.status, "Offline");
        assert!(current.last_status_change.is_none());
    }

    #[tokio::test]
    async fn test_unknown_agent_is_not_found() {
        let (h, _) = harness().await;
        let err = h
            .engine
            .transition(AgentId::new(), "Available", None)
            .await
            .unwrap_err();
        assert!(matches!(err, WallboardError::NotFound));
    }

    #[tokio::test]
    async fn test_transitions_follow_graph_step_by_step() {
        let (h, agent) = harness().await;
        for target in ["Available", "Busy", "Wrap", "Not Ready", "Offline"] {
            h.engine.transition(agent.id, target, None).await.unwrap();
        }
        let current = h.store.get(agent.id).await.unwrap();
        assert_eq!(current.status, "Offline");
    }
}
