//! Agent runtime for steward-rs
//!
//! This crate provides the dispatch loop ([`AgentExecutor`]) that sends a
//! query to the model and runs the tool calls it asks for, and the
//! [`ToolAgent`] assembled from configuration on top of it.

pub mod agents;
pub mod executor;

// Re-export key types
pub use agents::{ToolAgent, ToolAgentBuilder};
pub use executor::{
    AgentExecutor, AgentExecutorBuilder, DEFAULT_SYSTEM_PROMPT, DispatchOutcome, ExecutorConfig,
    NO_OPERATION,
};
