//! Status workflow configuration
//!
//! The status enumeration and transition graph are configuration data
//! received at startup, not hard-coded: alternate workflows work without
//! code changes. The graph maps each status to the set of statuses
//! reachable directly from it; self-loops exist only when listed.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

use crate::error::WallboardError;

/// Raw workflow document as loaded from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
    /// Ordered status enumeration
    pub statuses: Vec<String>,
    /// Status assigned to newly created agents when none is given
    pub initial: String,
    /// Status forced when a connection drops (bypasses the graph)
    pub offline: String,
    /// Adjacency table: status -> allowed next statuses
    pub transitions: HashMap<String, Vec<String>>,
}

#[derive(Debug, Error)]
#[error("invalid status workflow: {0}")]
pub struct WorkflowError(pub String);

/// Validated status workflow
#[derive(Debug, Clone)]
pub struct StatusWorkflow {
    statuses: Vec<String>,
    initial: String,
    offline: String,
    transitions: HashMap<String, Vec<String>>,
}

impl StatusWorkflow {
    /// Validate a raw config into a workflow
    ///
    /// Every status referenced by `initial`, `offline`, and the adjacency
    /// table (keys and targets) must be a member of the enumeration.
    pub fn new(config: WorkflowConfig) -> Result<Self, WorkflowError> {
        if config.statuses.is_empty() {
            return Err(WorkflowError("status enumeration is empty".to_string()));
        }

        let known = |s: &str| config.statuses.iter().any(|m| m == s);

        if !known(&config.initial) {
            return Err(WorkflowError(format!(
                "initial status {} is not in the enumeration",
                config.initial
            )));
        }
        if !known(&config.offline) {
            return Err(WorkflowError(format!(
                "offline status {} is not in the enumeration",
                config.offline
            )));
        }
        for (from, targets) in &config.transitions {
            if !known(from) {
                return Err(WorkflowError(format!(
                    "transition source {from} is not in the enumeration"
                )));
            }
            for to in targets {
                if !known(to) {
                    return Err(WorkflowError(format!(
                        "transition target {to} (from {from}) is not in the enumeration"
                    )));
                }
            }
        }

        Ok(Self {
            statuses: config.statuses,
            initial: config.initial,
            offline: config.offline,
            transitions: config.transitions,
        })
    }

    /// Parse and validate a workflow from a JSON document
    pub fn from_json(json: &str) -> Result<Self, WorkflowError> {
        let config: WorkflowConfig =
            serde_json::from_str(json).map_err(|e| WorkflowError(e.to_string()))?;
        Self::new(config)
    }

    /// The ordered status enumeration
    pub fn statuses(&self) -> &[String] {
        &self.statuses
    }

    /// Status for newly created agents
    pub fn initial(&self) -> &str {
        &self.initial
    }

    /// Status forced on disconnect
    pub fn offline(&self) -> &str {
        &self.offline
    }

    /// Whether a status is a member of the enumeration
    pub fn contains(&self, status: &str) -> bool {
        self.statuses.iter().any(|s| s == status)
    }

    /// Allowed next statuses from `from` (empty when none are declared)
    pub fn allowed(&self, from: &str) -> &[String] {
        self.transitions.get(from).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check that `from -> to` is an edge of the graph
    pub fn ensure_transition(&self, from: &str, to: &str) -> Result<(), WallboardError> {
        if !self.contains(to) {
            return Err(WallboardError::InvalidStatus(to.to_string()));
        }
        let allowed = self.allowed(from);
        if !allowed.iter().any(|s| s == to) {
            return Err(WallboardError::IllegalTransition {
                from: from.to_string(),
                to: to.to_string(),
                allowed: allowed.to_vec(),
            });
        }
        Ok(())
    }
}

impl Default for StatusWorkflow {
    /// The stock wallboard workflow
    fn default() -> Self {
        let statuses = ["Available", "Busy", "Wrap", "Break", "Not Ready", "Offline"];
        let transitions: &[(&str, &[&str])] = &[
            ("Available", &["Busy", "Wrap", "Break", "Not Ready"]),
            ("Busy", &["Available", "Wrap", "Not Ready"]),
            ("Wrap", &["Available", "Not Ready"]),
            ("Break", &["Available", "Not Ready"]),
            ("Not Ready", &["Available", "Offline"]),
            ("Offline", &["Available"]),
        ];

        Self {
            statuses: statuses.iter().map(|s| s.to_string()).collect(),
            initial: "Offline".to_string(),
            offline: "Offline".to_string(),
            transitions: transitions
                .iter()
                .map(|(from, to)| {
                    (
                        from.to_string(),
                        to.iter().map(|s| s.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_workflow_edges() {
        let workflow = StatusWorkflow::default();

        assert!(workflow.ensure_transition("Offline", "Available").is_ok());
        assert!(workflow.ensure_transition("Available", "Busy").is_ok());

        // No direct jump back to Offline from Available
        match workflow.ensure_transition("Available", "Offline") {
            Err(WallboardError::IllegalTransition { allowed, .. }) => {
                assert!(allowed.contains(&"Busy".to_string()));
                assert!(!allowed.contains(&"Offline".to_string()));
            }
            other => panic!("expected IllegalTransition, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_target_is_invalid_status() {
        let workflow = StatusWorkflow::default();
        match workflow.ensure_transition("Available", "Lunch") {
            Err(WallboardError::InvalidStatus(status)) => assert_eq!(status, "Lunch"),
            other => panic!("expected InvalidStatus, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_graph_from_json() {
        let json = r#"{
            "statuses": ["Idle", "Working", "Gone"],
            "initial": "Idle",
            "offline": "Gone",
            "transitions": {
                "Idle": ["Working"],
                "Working": ["Idle", "Working"],
                "Gone": ["Idle"]
            }
        }"#;
        let workflow = StatusWorkflow::from_json(json).unwrap();

        assert_eq!(workflow.initial(), "Idle");
        assert_eq!(workflow.offline(), "Gone");
        // Self-loop only where explicitly listed
        assert!(workflow.ensure_transition("Working", "Working").is_ok());
        assert!(workflow.ensure_transition("Idle", "Idle").is_err());
    }

    #[test]
    fn test_rejects_undeclared_statuses() {
        let json = r#"{
            "statuses": ["Idle"],
            "initial": "Idle",
            "offline": "Idle",
            "transitions": { "Idle": ["Gone"] }
        }"#;
        assert!(StatusWorkflow::from_json(json).is_err());

        let bad_initial = r#"{
            "statuses": ["Idle"],
            "initial": "Missing",
            "offline": "Idle",
            "transitions": {}
        }"#;
        assert!(StatusWorkflow::from_json(bad_initial).is_err());
    }

    #[test]
    fn test_status_without_declared_edges_has_none() {
        let json = r#"{
            "statuses": ["Idle", "Stuck"],
            "initial": "Idle",
            "offline": "Idle",
            "transitions": { "Idle": ["Stuck"] }
        }"#;
        let workflow = StatusWorkflow::from_json(json).unwrap();
        assert!(workflow.allowed("Stuck").is_empty());
        assert!(workflow.ensure_transition("Stuck", "Idle").is_err());
    }
}
