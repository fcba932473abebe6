//! Message delivery routes
//!
//! Messages are fire-and-forget: they are published to the target agent's
//! topic (or to every connection for "ALL") and never persisted or
//! replayed.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    websocket::events::ServerEvent,
    websocket::topics::Topic,
};

/// Recipient value addressing every connection
const BROADCAST_TARGET: &str = "ALL";

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub from: String,
    pub to: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub from: String,
    pub to: String,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Send a message to one agent's subscribers, or broadcast to all
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<SendMessageResponse>)> {
    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let topic = if req.to == BROADCAST_TARGET {
        Topic::All
    } else {
        // Target must be a known agent; unknown codes publish nothing
        state.store.get_by_code(&req.to).await?;
        Topic::Agent(req.to.clone())
    };

    let timestamp = OffsetDateTime::now_utc();
    state
        .broadcaster
        .publish(
            &topic,
            ServerEvent::NewMessage {
                from: req.from.clone(),
                to: req.to.clone(),
                message: req.message.clone(),
                timestamp,
            },
        )
        .await;

    tracing::info!(from = %req.from, to = %req.to, "Message published");
    Ok((
        StatusCode::OK,
        Json(SendMessageResponse {
            from: req.from,
            to: req.to,
            message: req.message,
            timestamp,
        }),
    ))
}
