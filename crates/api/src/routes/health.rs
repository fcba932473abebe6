//! Liveness and readiness probes
//!
//! `/health` reports overall service health including the agent store
//! backend; the bare probes are for orchestrator checks and carry no body.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::state::AppState;

/// Body of `/health`: overall state plus the store backend's state
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub store: &'static str,
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let store_ok = state.store.ping().await.is_ok();
    let label = if store_ok { "healthy" } else { "unhealthy" };
    let code = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(HealthResponse {
            status: label,
            version: env!("CARGO_PKG_VERSION"),
            store: label,
        }),
    )
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Ready only when the agent store answers
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store.ping().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
