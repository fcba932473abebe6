//! Dashboard summary endpoint

use axum::{extract::State, Json};

use crate::{dashboard::DashboardSnapshot, error::ApiResult, state::AppState};

/// Current aggregate statistics over the agent population
pub async fn get_summary(State(state): State<AppState>) -> ApiResult<Json<DashboardSnapshot>> {
    let snapshot = state.aggregator.snapshot().await?;
    Ok(Json(snapshot))
}
