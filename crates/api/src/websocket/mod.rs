//! WebSocket support for real-time wallboard updates
//!
//! - **Connection**: a live socket with an ordered outbound event channel
//! - **Events**: type-safe event definitions for client/server communication
//! - **Topics**: topic-scoped pub/sub for broadcasting events
//! - **Handler**: Axum WebSocket route handler wiring sockets to the
//!   presence registry

pub mod connection;
pub mod events;
pub mod handler;
pub mod topics;

pub use handler::ws_handler;
pub use topics::{EventBroadcaster, Topic};
