//! Tool framework for steward-rs
//!
//! This crate provides the contract for tools an LLM agent can call: a
//! declared [`ToolSpec`], the configured [`ToolBase`] every tool carries,
//! the async [`Tool`] trait, and an explicit [`ToolRegistry`] of
//! constructors.

pub mod builtin;
pub mod os;
pub mod registry;
pub mod result;
pub mod schema;
pub mod tool;

pub use builtin::register_builtin_tools;
pub use os::Os;
pub use registry::{ToolConstructor, ToolEntry, ToolRegistry};
pub use result::{ToolOutput, ToolResult};
pub use schema::ToolSchema;
pub use tool::{ConfigItem, Tool, ToolBase, ToolSpec, optional_argument, required_argument};
