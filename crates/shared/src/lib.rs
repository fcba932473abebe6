//! Wallboard Shared Types and Utilities
//!
//! This crate contains the domain types, errors, status workflow, and
//! agent store implementations shared across the wallboard platform.

pub mod db;
pub mod error;
pub mod store;
pub mod types;
pub mod workflow;

pub use db::*;
pub use error::*;
pub use store::{AgentStore, MemoryAgentStore};
pub use types::*;
pub use workflow::StatusWorkflow;
