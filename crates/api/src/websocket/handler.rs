//! WebSocket handler for Axum
//!
//! Accepts connections, routes inbound events to the presence registry,
//! and cleans up presence state when the socket closes.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{stream::StreamExt, SinkExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use wallboard_shared::WallboardError;

use crate::state::AppState;

use super::{
    connection::Connection,
    events::{ClientEvent, ServerEvent},
    topics::Topic,
};

/// WebSocket handler - upgrades HTTP connection to WebSocket
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // Channel for sending events to this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let conn = state.broadcaster.add_connection(Connection::new(tx)).await;
    let connection_id = conn.connection_id;

    // Acknowledge the connection
    let _ = conn.send(ServerEvent::Connected { connection_id });

    // Writer task: drain queued events onto the socket
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        break; // Connection closed
                    }
                }
                Err(e) => {
                    tracing::error!(error = ?e, "Failed to serialize WebSocket event");
                }
            }
        }
    });

    // Reader loop
    while let Some(msg) = receiver.next().await {
        if let Ok(msg) = msg {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => {
                        handle_client_event(event, Arc::clone(&conn), &state).await;
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = ?e,
                            connection_id = %connection_id,
                            "Failed to parse client event"
                        );
                        let _ = conn.send(ServerEvent::Error {
                            message: "Invalid event format".to_string(),
                        });
                    }
                },
                Message::Close(_) => {
                    tracing::info!(connection_id = %connection_id, "WebSocket close frame received");
                    break;
                }
                Message::Ping(_) | Message::Pong(_) => {
                    // Axum handles ping/pong automatically
                }
                _ => {} // Ignore binary messages
            }
        }
    }

    // Cleanup on disconnect: force the bound agent offline, then drop the
    // connection from every topic.
    tracing::info!(connection_id = %connection_id, "WebSocket connection closing");
    if let Err(e) = state.presence.on_disconnect(connection_id).await {
        tracing::error!(error = %e, connection_id = %connection_id, "Failed to clean up presence");
    }
    state.broadcaster.remove_connection(&connection_id).await;

    send_task.abort();
}

/// Handle client event
async fn handle_client_event(event: ClientEvent, conn: Arc<Connection>, state: &AppState) {
    match event {
        ClientEvent::Login {
            agent_code,
            agent_name,
        } => match state
            .presence
            .on_login(conn.connection_id, &agent_code, &agent_name)
            .await
        {
            Ok(agent) => {
                state
                    .broadcaster
                    .join(&Topic::Agent(agent_code.clone()), Arc::clone(&conn))
                    .await;
                let _ = conn.send(ServerEvent::LoginSuccess {
                    agent: Box::new(agent),
                    message: "Successfully connected to Agent Wallboard".to_string(),
                });
            }
            Err(WallboardError::NotFound) => {
                // Failed logins surface to this connection only
                let _ = conn.send(ServerEvent::LoginError {
                    message: format!("Agent {agent_code} not found"),
                });
            }
            Err(e) => {
                tracing::error!(error = %e, agent_code = %agent_code, "Agent login failed");
                let _ = conn.send(ServerEvent::LoginError {
                    message: "Login failed".to_string(),
                });
            }
        },

        ClientEvent::Logout => {
            if let Some(session) = state.presence.session_for(conn.connection_id).await {
                state
                    .broadcaster
                    .leave(&Topic::Agent(session.agent_code), &conn.connection_id)
                    .await;
            }
            if let Err(e) = state.presence.on_disconnect(conn.connection_id).await {
                tracing::error!(error = %e, connection_id = %conn.connection_id, "Agent logout failed");
            }
        }

        ClientEvent::JoinDashboard => {
            state.presence.on_join_dashboard(Arc::clone(&conn)).await;
        }

        ClientEvent::Ping => {
            let _ = conn.send(ServerEvent::Pong);
        }
    }
}
