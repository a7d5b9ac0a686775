//! Tool definition types for LLM function calling

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition sent to the LLM provider
///
/// This describes a tool that the LLM can call, including its name,
/// description, and parameter schema in JSON Schema format. Providers wrap
/// it in their own envelope (`{"type": "function", "function": {...}}` for
/// OpenAI-compatible endpoints).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match the tool the agent dispatches to)
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON schema for the tool's parameters
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A function call requested by the model
///
/// `arguments` is the raw string from the response payload. It is meant to
/// be JSON but may be truncated or malformed; see [`crate::JsonFixer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Call ID assigned by the provider
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Raw JSON argument string
    pub arguments: String,
}

impl FunctionCall {
    /// Create a new function call
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}
