//! WebSocket connection handle
//!
//! Represents one live socket; events are queued on an unbounded channel
//! and drained by the connection's writer task.

use tokio::sync::mpsc;
use wallboard_shared::ConnectionId;

use super::events::ServerEvent;

/// An active WebSocket connection
#[derive(Debug)]
pub struct Connection {
    /// Unique ID for this connection, created on connect
    pub connection_id: ConnectionId,

    /// Channel to send events to this connection
    pub sender: mpsc::UnboundedSender<ServerEvent>,
}

impl Connection {
    pub fn new(sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            connection_id: ConnectionId::new(),
            sender,
        }
    }

    /// Send an event to this connection
    ///
    /// Returns Ok(()) if queued successfully, Err if the connection is closed
    #[allow(clippy::result_large_err)] // Error type is from tokio mpsc, containing the failed event
    pub fn send(&self, event: ServerEvent) -> Result<(), mpsc::error::SendError<ServerEvent>> {
        self.sender.send(event)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Allow unwrap() in tests for cleaner test code
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_delivers_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = Connection::new(tx);

        conn.send(ServerEvent::Pong).unwrap();
        conn.send(ServerEvent::Error {
            message: "second".to_string(),
        })
        .unwrap();

        assert!(matches!(rx.try_recv().unwrap(), ServerEvent::Pong));
        assert!(matches!(rx.try_recv().unwrap(), ServerEvent::Error { .. }));
    }

    #[tokio::test]
    async fn test_send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Connection::new(tx);
        drop(rx);

        assert!(conn.send(ServerEvent::Pong).is_err());
    }
}
