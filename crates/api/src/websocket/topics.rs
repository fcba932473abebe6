//! Topic-scoped event broadcasting
//!
//! Tracks every live connection plus named topic membership, and fans
//! events out to subscribers. Delivery is fire-and-forget and at-most-once:
//! a subscriber not connected at publish time never receives the event.
//! Within one topic, publish order is preserved (each subscriber drains an
//! ordered channel fed by a single publishing pass).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use wallboard_shared::ConnectionId;

use super::connection::Connection;
use super::events::ServerEvent;

/// A named channel subscribers join to receive a class of events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topic {
    /// Messages addressed to one agent's subscribers
    Agent(String),
    /// Aggregate dashboard subscribers
    Dashboard,
    /// Every live connection
    All,
}

impl Topic {
    /// Topic name used as the membership key
    ///
    /// `All` has no membership list; it targets the connection table itself.
    fn name(&self) -> Option<String> {
        match self {
            Topic::Agent(code) => Some(format!("agent:{code}")),
            Topic::Dashboard => Some("dashboard".to_string()),
            Topic::All => None,
        }
    }
}

/// Publishes named events to topic-scoped subscriber groups
///
/// Holds no agent data, only subscription membership.
#[derive(Default)]
pub struct EventBroadcaster {
    /// All active connections indexed by connection_id
    connections: RwLock<HashMap<ConnectionId, Arc<Connection>>>,

    /// Topic name -> subscribers, in subscription order
    topics: RwLock<HashMap<String, Vec<Arc<Connection>>>>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection
    pub async fn add_connection(&self, conn: Connection) -> Arc<Connection> {
        let conn = Arc::new(conn);
        let mut connections = self.connections.write().await;
        connections.insert(conn.connection_id, Arc::clone(&conn));

        tracing::info!(
            connection_id = %conn.connection_id,
            total_connections = connections.len(),
            "WebSocket connection added"
        );

        conn
    }

    /// Remove a connection and drop it from every topic
    pub async fn remove_connection(&self, connection_id: &ConnectionId) {
        let mut connections = self.connections.write().await;
        if connections.remove(connection_id).is_some() {
            let mut topics = self.topics.write().await;
            for subscribers in topics.values_mut() {
                subscribers.retain(|c| c.connection_id != *connection_id);
            }
            topics.retain(|_, subscribers| !subscribers.is_empty());

            tracing::info!(
                connection_id = %connection_id,
                remaining_connections = connections.len(),
                "WebSocket connection removed"
            );
        }
    }

    /// Subscribe a connection to a topic
    pub async fn join(&self, topic: &Topic, conn: Arc<Connection>) {
        let Some(name) = topic.name() else {
            return; // every connection is already in Topic::All
        };

        let mut topics = self.topics.write().await;
        let subscribers = topics.entry(name.clone()).or_default();
        if !subscribers
            .iter()
            .any(|c| c.connection_id == conn.connection_id)
        {
            subscribers.push(Arc::clone(&conn));
        }

        tracing::debug!(
            topic = %name,
            connection_id = %conn.connection_id,
            subscribers = subscribers.len(),
            "Connection joined topic"
        );
    }

    /// Unsubscribe a connection from a topic
    pub async fn leave(&self, topic: &Topic, connection_id: &ConnectionId) {
        let Some(name) = topic.name() else {
            return;
        };

        let mut topics = self.topics.write().await;
        if let Some(subscribers) = topics.get_mut(&name) {
            subscribers.retain(|c| c.connection_id != *connection_id);
            if subscribers.is_empty() {
                topics.remove(&name);
            }
        }
    }

    /// Publish an event to all subscribers of a topic
    ///
    /// Send errors are logged and ignored; closed connections are cleaned
    /// up when their socket task exits.
    pub async fn publish(&self, topic: &Topic, event: ServerEvent) {
        match topic.name() {
            None => {
                let connections = self.connections.read().await;
                for conn in connections.values() {
                    if conn.send(event.clone()).is_err() {
                        tracing::warn!(
                            connection_id = %conn.connection_id,
                            "Failed to send event to connection (likely closed)"
                        );
                    }
                }
            }
            Some(name) => {
                let topics = self.topics.read().await;
                if let Some(subscribers) = topics.get(&name) {
                    for conn in subscribers {
                        if conn.send(event.clone()).is_err() {
                            tracing::warn!(
                                connection_id = %conn.connection_id,
                                topic = %name,
                                "Failed to send event to subscriber (likely closed)"
                            );
                        }
                    }
                } else {
                    tracing::debug!(topic = %name, "No subscribers for topic");
                }
            }
        }
    }

    /// Number of live connections
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Number of subscribers on a topic
    pub async fn topic_size(&self, topic: &Topic) -> usize {
        match topic.name() {
            None => self.connection_count().await,
            Some(name) => self
                .topics
                .read()
                .await
                .get(&name)
                .map(Vec::len)
                .unwrap_or(0),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Allow unwrap() in tests for cleaner test code
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn test_connection() -> (Arc<Connection>, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Connection::new(tx)), rx)
    }

    #[tokio::test]
    async fn test_join_and_leave_topic() {
        let broadcaster = EventBroadcaster::new();
        let (conn, _rx) = test_connection();
        let topic = Topic::Agent("A001".to_string());

        assert_eq!(broadcaster.topic_size(&topic).await, 0);

        broadcaster.join(&topic, Arc::clone(&conn)).await;
        assert_eq!(broadcaster.topic_size(&topic).await, 1);

        // Joining twice does not duplicate membership
        broadcaster.join(&topic, Arc::clone(&conn)).await;
        assert_eq!(broadcaster.topic_size(&topic).await, 1);

        broadcaster.leave(&topic, &conn.connection_id).await;
        assert_eq!(broadcaster.topic_size(&topic).await, 0);
    }

    #[tokio::test]
    async fn test_publish_to_topic_preserves_order() {
        let broadcaster = EventBroadcaster::new();
        let (conn, mut rx) = test_connection();
        broadcaster.join(&Topic::Dashboard, conn).await;

        for message in ["first", "second", "third"] {
            broadcaster
                .publish(
                    &Topic::Dashboard,
                    ServerEvent::Error {
                        message: message.to_string(),
                    },
                )
                .await;
        }

        for expected in ["first", "second", "third"] {
            match rx.try_recv().unwrap() {
                ServerEvent::Error { message } => assert_eq!(message, expected),
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_publish_to_all_reaches_every_connection() {
        let broadcaster = EventBroadcaster::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        broadcaster.add_connection(Connection::new(tx1)).await;
        broadcaster.add_connection(Connection::new(tx2)).await;

        broadcaster.publish(&Topic::All, ServerEvent::Pong).await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_topic_scoping() {
        let broadcaster = EventBroadcaster::new();
        let (subscriber, mut sub_rx) = test_connection();
        let (other, mut other_rx) = test_connection();

        broadcaster
            .join(&Topic::Agent("A001".to_string()), subscriber)
            .await;
        broadcaster
            .join(&Topic::Agent("A002".to_string()), other)
            .await;

        broadcaster
            .publish(&Topic::Agent("A001".to_string()), ServerEvent::Pong)
            .await;

        assert!(sub_rx.try_recv().is_ok());
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remove_connection_clears_memberships() {
        let broadcaster = EventBroadcaster::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = broadcaster.add_connection(Connection::new(tx)).await;

        broadcaster.join(&Topic::Dashboard, Arc::clone(&conn)).await;
        broadcaster
            .join(&Topic::Agent("A001".to_string()), Arc::clone(&conn))
            .await;

        broadcaster.remove_connection(&conn.connection_id).await;

        assert_eq!(broadcaster.connection_count().await, 0);
        assert_eq!(broadcaster.topic_size(&Topic::Dashboard).await, 0);
        assert_eq!(
            broadcaster
                .topic_size(&Topic::Agent("A001".to_string()))
                .await,
            0
        );
    }

    #[tokio::test]
    async fn test_publish_to_closed_subscriber_is_ignored() {
        let broadcaster = EventBroadcaster::new();
        let (conn, rx) = test_connection();
        broadcaster.join(&Topic::Dashboard, conn).await;
        drop(rx);

        // Must not panic or error
        broadcaster.publish(&Topic::Dashboard, ServerEvent::Pong).await;
    }
}
