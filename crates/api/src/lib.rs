//! Wallboard API Library
//!
//! This crate contains the HTTP + WebSocket service for the agent
//! wallboard: presence tracking, status transitions, and dashboard
//! broadcasting.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod presence;
pub mod routes;
pub mod state;
pub mod transitions;
pub mod websocket;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
