//! WebSocket event types and serialization
//!
//! Defines all client-to-server and server-to-client event types with
//! type-safe serde serialization. Event names and payload fields keep the
//! wire format existing wallboard dashboards already speak.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use wallboard_shared::{Agent, AgentId, ConnectionId, StatusChange};

// =============================================================================
// Client-to-Server Events
// =============================================================================

/// Events sent from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Bind this connection to an agent identity
    #[serde(rename = "agent-login")]
    Login {
        agent_code: String,
        agent_name: String,
    },

    /// Release the agent binding without closing the socket
    #[serde(rename = "agent-logout")]
    Logout,

    /// Subscribe to aggregate dashboard updates
    #[serde(rename = "join-dashboard")]
    JoinDashboard,

    /// Heartbeat ping to keep connection alive
    #[serde(rename = "ping")]
    Ping,
}

// =============================================================================
// Server-to-Client Events
// =============================================================================

/// Events sent from server to client
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Connection acknowledged
    #[serde(rename = "connected")]
    Connected { connection_id: ConnectionId },

    /// An agent came online (broadcast)
    #[serde(rename = "agent-online")]
    AgentOnline {
        agent_code: String,
        agent_name: String,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },

    /// An agent went offline (broadcast)
    #[serde(rename = "agent-offline")]
    AgentOffline {
        agent_code: String,
        agent_name: String,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },

    /// Login accepted (sent to the logging-in connection only)
    #[serde(rename = "login-success")]
    LoginSuccess { agent: Box<Agent>, message: String },

    /// Login rejected (sent to the logging-in connection only)
    #[serde(rename = "login-error")]
    LoginError { message: String },

    /// An agent's status changed (broadcast)
    #[serde(rename = "agentStatusChanged")]
    AgentStatusChanged {
        id: AgentId,
        agent_code: String,
        status: String,
        last_status_change: Option<StatusChange>,
    },

    /// Aggregate statistics for dashboard subscribers
    #[serde(rename = "dashboardUpdate")]
    DashboardUpdate {
        total_agents: usize,
        online_agents: usize,
        offline_agents: usize,
        status_breakdown: BTreeMap<String, usize>,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },

    /// Direct message delivered to an agent topic
    #[serde(rename = "newMessage")]
    NewMessage {
        from: String,
        to: String,
        message: String,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },

    /// Heartbeat response
    #[serde(rename = "pong")]
    Pong,

    /// Error message
    #[serde(rename = "error")]
    Error { message: String },
}
