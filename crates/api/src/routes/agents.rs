//! Agent management routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wallboard_shared::{Agent, AgentFilter, AgentId, AgentUpdate, NewAgent, StatusChange};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentRequest {
    pub agent_code: String,
    pub name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Defaults to the workflow's initial status
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAgentRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub skills: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AgentListResponse {
    pub agents: Vec<Agent>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeResponse {
    pub id: AgentId,
    pub agent_code: String,
    pub status: String,
    pub last_status_change: Option<StatusChange>,
}

// =============================================================================
// Handlers
// =============================================================================

/// List agents, optionally filtered by status, department, or presence
pub async fn list_agents(
    State(state): State<AppState>,
    Query(filter): Query<AgentFilter>,
) -> ApiResult<Json<AgentListResponse>> {
    let agents = state.store.list(&filter).await?;
    let total = agents.len();
    Ok(Json(AgentListResponse { agents, total }))
}

/// Create a new agent
pub async fn create_agent(
    State(state): State<AppState>,
    Json(req): Json<CreateAgentRequest>,
) -> ApiResult<(StatusCode, Json<Agent>)> {
    if req.agent_code.trim().is_empty() {
        return Err(ApiError::BadRequest("agentCode must not be empty".to_string()));
    }
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }

    let status = match req.status {
        Some(status) => {
            if !state.workflow.contains(&status) {
                return Err(ApiError::InvalidStatus(status));
            }
            status
        }
        None => state.workflow.initial().to_string(),
    };

    let agent = state
        .store
        .create(NewAgent {
            agent_code: req.agent_code,
            name: req.name,
            email: req.email,
            department: req.department,
            skills: req.skills,
            status,
        })
        .await?;

    tracing::info!(agent_code = %agent.agent_code, "Created agent");
    Ok((StatusCode::CREATED, Json(agent)))
}

/// Fetch a single agent
pub async fn get_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<Uuid>,
) -> ApiResult<Json<Agent>> {
    let agent = state.store.get(AgentId(agent_id)).await?;
    Ok(Json(agent))
}

/// Update an agent's descriptive fields
pub async fn update_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<Uuid>,
    Json(req): Json<UpdateAgentRequest>,
) -> ApiResult<Json<Agent>> {
    // The store update is a read-modify-write of the whole row; hold the
    // agent's mutation lock so a concurrent transition or presence change
    // cannot be clobbered with stale status fields.
    let agent = state.store.get(AgentId(agent_id)).await?;
    let _guard = state.locks.acquire(&agent.agent_code).await;

    let agent = state
        .store
        .update(
            AgentId(agent_id),
            AgentUpdate {
                name: req.name,
                email: req.email,
                department: req.department,
                skills: req.skills,
                ..Default::default()
            },
        )
        .await?;

    tracing::info!(agent_code = %agent.agent_code, "Updated agent");
    Ok(Json(agent))
}

/// Delete an agent, dropping any live presence binding silently
pub async fn delete_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let agent = state.store.get(AgentId(agent_id)).await?;

    state.presence.forget_agent(&agent.agent_code).await;
    state.store.delete(agent.id).await?;
    state.aggregator.push_update().await;

    tracing::info!(agent_code = %agent.agent_code, "Deleted agent");
    Ok(StatusCode::NO_CONTENT)
}

/// Apply a status transition
pub async fn update_agent_status(
    State(state): State<AppState>,
    Path(agent_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<StatusChangeResponse>> {
    let agent = state
        .engine
        .transition(AgentId(agent_id), &req.status, req.reason)
        .await?;

    Ok(Json(StatusChangeResponse {
        id: agent.id,
        agent_code: agent.agent_code,
        status: agent.status,
        last_status_change: agent.last_status_change,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Allow unwrap() in tests for cleaner test code
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use wallboard_shared::{MemoryAgentStore, StatusWorkflow};

    fn test_state() -> AppState {
        AppState::new(
            crate::config::Config {
                bind_address: "127.0.0.1:0".to_string(),
                database_url: None,
                workflow_path: None,
                allowed_origins: vec!["http://localhost:3000".to_string()],
            },
            Arc::new(MemoryAgentStore::new()),
            StatusWorkflow::default(),
        )
    }

    fn create_request(code: &str) -> CreateAgentRequest {
        CreateAgentRequest {
            agent_code: code.to_string(),
            name: format!("Agent {code}"),
            email: None,
            department: None,
            skills: vec![],
            status: None,
        }
    }

    #[tokio::test]
    async fn test_create_defaults_to_initial_status() {
        let state = test_state();
        let (status, Json(agent)) =
            create_agent(State(state), Json(create_request("A001"))).await.unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(agent.status, "Offline");
        assert!(!agent.is_online);
    }

    #[tokio::test]
    async fn test_create_duplicate_code_conflicts() {
        let state = test_state();
        create_agent(State(state.clone()), Json(create_request("A001")))
            .await
            .unwrap();

        let err = create_agent(State(state), Json(create_request("A001")))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(code) if code == "A001"));
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_status() {
        let state = test_state();
        let err = create_agent(
            State(state),
            Json(CreateAgentRequest {
                status: Some("Lunch".to_string()),
                ..create_request("A001")
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidStatus(s) if s == "Lunch"));
    }

    #[tokio::test]
    async fn test_status_transition_scenario() {
        let state = test_state();
        let (_, Json(agent)) =
            create_agent(State(state.clone()), Json(create_request("A001"))).await.unwrap();

        // Offline -> Available is allowed
        let Json(response) = update_agent_status(
            State(state.clone()),
            Path(agent.id.0),
            Json(UpdateStatusRequest {
                status: "Available".to_string(),
                reason: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.status, "Available");
        assert!(response.last_status_change.is_some());

        // Available -> Offline directly is not an edge
        let err = update_agent_status(
            State(state.clone()),
            Path(agent.id.0),
            Json(UpdateStatusRequest {
                status: "Offline".to_string(),
                reason: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::IllegalTransition(_)));

        // Status unchanged by the failed transition
        let Json(current) = get_agent(State(state), Path(agent.id.0)).await.unwrap();
        assert_eq!(current.status, "Available");
    }

    #[tokio::test]
    async fn test_update_waits_for_agent_mutation_lock() {
        let state = test_state();
        let (_, Json(agent)) =
            create_agent(State(state.clone()), Json(create_request("A001"))).await.unwrap();
        let agent_id = agent.id.0;

        let guard = state.locks.acquire("A001").await;

        let update_state = state.clone();
        let mut handle = tokio::spawn(async move {
            update_agent(
                State(update_state),
                Path(agent_id),
                Json(UpdateAgentRequest {
                    name: Some("Renamed".to_string()),
                    email: None,
                    department: None,
                    skills: None,
                }),
            )
            .await
        });

        // While another mutation holds the agent's lock, the update must
        // not commit.
        assert!(tokio::time::timeout(Duration::from_millis(50), &mut handle)
            .await
            .is_err());
        let Json(current) = get_agent(State(state.clone()), Path(agent_id)).await.unwrap();
        assert_eq!(current.name, "Agent A001");

        drop(guard);
        let Json(updated) = handle.await.unwrap().unwrap();
        assert_eq!(updated.name, "Renamed");
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let state = test_state();
        let (_, Json(agent)) =
            create_agent(State(state.clone()), Json(create_request("A001"))).await.unwrap();

        let status = delete_agent(State(state.clone()), Path(agent.id.0))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let err = get_agent(State(state), Path(agent.id.0)).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[tokio::test]
    async fn test_list_with_filter() {
        let state = test_state();
        create_agent(State(state.clone()), Json(create_request("A001")))
            .await
            .unwrap();
        create_agent(
            State(state.clone()),
            Json(CreateAgentRequest {
                department: Some("Support".to_string()),
                ..create_request("B001")
            }),
        )
        .await
        .unwrap();

        let Json(all) = list_agents(State(state.clone()), Query(AgentFilter::default()))
            .await
            .unwrap();
        assert_eq!(all.total, 2);

        let Json(support) = list_agents(
            State(state),
            Query(AgentFilter {
                department: Some("Support".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(support.total, 1);
        assert_eq!(support.agents[0].agent_code, "B001");
    }
}
