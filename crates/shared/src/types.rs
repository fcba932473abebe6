//! Common types used across the wallboard platform

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// ID Wrappers
// =============================================================================

/// Agent ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AgentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Connection ID wrapper for a live WebSocket session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ConnectionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// Agent Record
// =============================================================================

/// Timestamp and optional reason recorded on every status transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub reason: Option<String>,
}

/// A tracked call-center agent
///
/// `agent_code` is unique across all agents at all times. `connection_ref`
/// is a non-owning reference to the current live connection; it is cleared
/// whenever `is_online` goes false.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: AgentId,
    pub agent_code: String,
    pub name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub skills: Vec<String>,
    pub status: String,
    pub is_online: bool,
    pub connection_ref: Option<ConnectionId>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub login_time: Option<OffsetDateTime>,
    pub last_status_change: Option<StatusChange>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Payload for creating a new agent record
///
/// `status` is the resolved initial status; callers validate it against the
/// configured workflow before handing it to the store.
#[derive(Debug, Clone)]
pub struct NewAgent {
    pub agent_code: String,
    pub name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub skills: Vec<String>,
    pub status: String,
}

/// Partial update applied to an existing agent record
///
/// `None` leaves a field untouched. Nullable columns use a nested `Option`
/// so callers can distinguish "leave as is" from "set to null".
#[derive(Debug, Clone, Default)]
pub struct AgentUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub skills: Option<Vec<String>>,
    pub status: Option<String>,
    pub is_online: Option<bool>,
    pub connection_ref: Option<Option<ConnectionId>>,
    pub login_time: Option<Option<OffsetDateTime>>,
    pub last_status_change: Option<StatusChange>,
}

impl AgentUpdate {
    /// Apply this update to an agent record, bumping `updated_at`
    pub fn apply(self, agent: &mut Agent) {
        if let Some(name) = self.name {
            agent.name = name;
        }
        if let Some(email) = self.email {
            agent.email = Some(email);
        }
        if let Some(department) = self.department {
            agent.department = Some(department);
        }
        if let Some(skills) = self.skills {
            agent.skills = skills;
        }
        if let Some(status) = self.status {
            agent.status = status;
        }
        if let Some(is_online) = self.is_online {
            agent.is_online = is_online;
        }
        if let Some(connection_ref) = self.connection_ref {
            agent.connection_ref = connection_ref;
        }
        if let Some(login_time) = self.login_time {
            agent.login_time = login_time;
        }
        if let Some(change) = self.last_status_change {
            agent.last_status_change = Some(change);
        }
        agent.updated_at = OffsetDateTime::now_utc();
    }
}

/// Filter for listing agents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentFilter {
    pub status: Option<String>,
    pub department: Option<String>,
    pub is_online: Option<bool>,
}

impl AgentFilter {
    pub fn matches(&self, agent: &Agent) -> bool {
        if let Some(status) = &self.status {
            if agent.status != *status {
                return false;
            }
        }
        if let Some(department) = &self.department {
            if agent.department.as_deref() != Some(department.as_str()) {
                return false;
            }
        }
        if let Some(is_online) = self.is_online {
            if agent.is_online != is_online {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_agent() -> Agent {
        let now = OffsetDateTime::now_utc();
        Agent {
            id: AgentId::new(),
            agent_code: "A001".to_string(),
            name: "Alice".to_string(),
            email: None,
            department: Some("Sales".to_string()),
            skills: vec!["thai".to_string()],
            status: "Offline".to_string(),
            is_online: false,
            connection_ref: None,
            login_time: None,
            last_status_change: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_agent_serializes_camel_case() {
        let agent = sample_agent();
        let json = serde_json::to_value(&agent).unwrap();
        assert!(json.get("agentCode").is_some());
        assert!(json.get("isOnline").is_some());
        assert!(json.get("connectionRef").is_some());
        assert!(json.get("agent_code").is_none());
    }

    #[test]
    fn test_update_clears_nullable_fields() {
        let mut agent = sample_agent();
        agent.is_online = true;
        agent.connection_ref = Some(ConnectionId::new());

        let update = AgentUpdate {
            is_online: Some(false),
            connection_ref: Some(None),
            ..Default::default()
        };
        update.apply(&mut agent);

        assert!(!agent.is_online);
        assert!(agent.connection_ref.is_none());
        // Untouched fields stay as they were
        assert_eq!(agent.name, "Alice");
    }

    #[test]
    fn test_filter_matches() {
        let agent = sample_agent();

        let by_status = AgentFilter {
            status: Some("Offline".to_string()),
            ..Default::default()
        };
        assert!(by_status.matches(&agent));

        let by_department = AgentFilter {
            department: Some("Support".to_string()),
            ..Default::default()
        };
        assert!(!by_department.matches(&agent));

        let by_online = AgentFilter {
            is_online: Some(true),
            ..Default::default()
        };
        assert!(!by_online.matches(&agent));
    }
}
