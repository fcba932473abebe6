//! Dashboard aggregation
//!
//! Computes summary statistics over the current agent population and
//! pushes them to dashboard-topic subscribers on presence changes. The
//! snapshot reads the store without holding agent locks; a bounded
//! staleness window is acceptable for an observational aggregate.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use wallboard_shared::{AgentFilter, AgentStore, StatusWorkflow, WallboardError};

use crate::websocket::connection::Connection;
use crate::websocket::events::ServerEvent;
use crate::websocket::topics::{EventBroadcaster, Topic};

/// Point-in-time aggregate over all agent records
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub total_agents: usize,
    /// Count per status; every configured status is present, zeroes included
    pub status_counts: BTreeMap<String, usize>,
    /// round(count / total * 100); all zero when total is zero
    pub status_percentages: BTreeMap<String, u32>,
    pub online_agents: usize,
    pub offline_agents: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl DashboardSnapshot {
    fn to_event(&self) -> ServerEvent {
        ServerEvent::DashboardUpdate {
            total_agents: self.total_agents,
            online_agents: self.online_agents,
            offline_agents: self.offline_agents,
            status_breakdown: self.status_counts.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// Computes and publishes dashboard summaries
pub struct DashboardAggregator {
    store: Arc<dyn AgentStore>,
    workflow: Arc<StatusWorkflow>,
    broadcaster: Arc<EventBroadcaster>,
}

impl DashboardAggregator {
    pub fn new(
        store: Arc<dyn AgentStore>,
        workflow: Arc<StatusWorkflow>,
        broadcaster: Arc<EventBroadcaster>,
    ) -> Self {
        Self {
            store,
            workflow,
            broadcaster,
        }
    }

    /// Compute a snapshot over the current agent population
    pub async fn snapshot(&self) -> Result<DashboardSnapshot, WallboardError> {
        let agents = self.store.list(&AgentFilter::default()).await?;
        let total = agents.len();

        let mut status_counts: BTreeMap<String, usize> = self
            .workflow
            .statuses()
            .iter()
            .map(|s| (s.clone(), 0))
            .collect();
        let mut online = 0;
        for agent in &agents {
            *status_counts.entry(agent.status.clone()).or_insert(0) += 1;
            if agent.is_online {
                online += 1;
            }
        }

        let status_percentages = status_counts
            .iter()
            .map(|(status, &count)| {
                let pct = if total == 0 {
                    0
                } else {
                    (count as f64 / total as f64 * 100.0).round() as u32
                };
                (status.clone(), pct)
            })
            .collect();

        Ok(DashboardSnapshot {
            total_agents: total,
            status_counts,
            status_percentages,
            online_agents: online,
            offline_agents: total - online,
            timestamp: OffsetDateTime::now_utc(),
        })
    }

    /// Recompute and publish to all dashboard-topic subscribers
    pub async fn push_update(&self) {
        match self.snapshot().await {
            Ok(snapshot) => {
                self.broadcaster
                    .publish(&Topic::Dashboard, snapshot.to_event())
                    .await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to compute dashboard snapshot");
            }
        }
    }

    /// Push the current snapshot to a single subscriber
    pub async fn push_to(&self, conn: &Connection) {
        match self.snapshot().await {
            Ok(snapshot) => {
                let _ = conn.send(snapshot.to_event());
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    connection_id = %conn.connection_id,
                    "Failed to compute dashboard snapshot"
                );
            }
        }
    }
}
