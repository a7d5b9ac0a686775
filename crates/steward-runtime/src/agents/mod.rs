//! Concrete agent implementations
//!
//! - ToolAgent: configured from a `Config`, dispatches to its tools and can
//!   itself be used as a tool

pub mod tool;

pub use tool::{ToolAgent, ToolAgentBuilder};
