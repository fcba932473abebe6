//! Application state shared across handlers

use std::sync::Arc;

use wallboard_shared::{AgentStore, StatusWorkflow};

use crate::config::Config;
use crate::dashboard::DashboardAggregator;
use crate::presence::{AgentLocks, PresenceRegistry};
use crate::transitions::StatusEngine;
use crate::websocket::topics::EventBroadcaster;

/// Shared application state
///
/// Components are wired here once at startup and passed by reference;
/// there are no module-level singletons.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn AgentStore>,
    pub workflow: Arc<StatusWorkflow>,
    pub broadcaster: Arc<EventBroadcaster>,
    pub aggregator: Arc<DashboardAggregator>,
    pub presence: Arc<PresenceRegistry>,
    pub engine: Arc<StatusEngine>,
    /// Per-agent mutation locks; every read-modify-write of an agent
    /// record must hold the agent's lock
    pub locks: Arc<AgentLocks>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn AgentStore>, workflow: StatusWorkflow) -> Self {
        let workflow = Arc::new(workflow);
        let broadcaster = Arc::new(EventBroadcaster::new());
        let locks = Arc::new(AgentLocks::new());
        let aggregator = Arc::new(DashboardAggregator::new(
            Arc::clone(&store),
            Arc::clone(&workflow),
            Arc::clone(&broadcaster),
        ));
        let presence = Arc::new(PresenceRegistry::new(
            Arc::clone(&store),
            Arc::clone(&workflow),
            Arc::clone(&broadcaster),
            Arc::clone(&aggregator),
            Arc::clone(&locks),
        ));
        let engine = Arc::new(StatusEngine::new(
            Arc::clone(&store),
            Arc::clone(&workflow),
            Arc::clone(&broadcaster),
            Arc::clone(&locks),
        ));

        Self {
            config: Arc::new(config),
            store,
            workflow,
            broadcaster,
            aggregator,
            presence,
            engine,
            locks,
        }
    }
}
