//! Values returned by tool invocations

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// Structured outcome of a tool call
///
/// The display form (what the model and the user see) carries only
/// `status` and `content`; [`ToolResult::to_value`] keeps every field,
/// including the `action` a caller may want to act on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Short status word, e.g. `"success"`
    pub status: String,
    /// Human-readable result
    pub content: String,
    /// Optional machine-readable follow-up for the caller
    #[serde(default)]
    pub action: Option<Value>,
    /// Whether this came from a tool (as opposed to a synthesized reply)
    #[serde(default = "default_is_tool_result")]
    pub is_tool_result: bool,
}

fn default_is_tool_result() -> bool {
    true
}

impl ToolResult {
    /// Create a result with the given status and content
    pub fn new(status: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            content: content.into(),
            action: None,
            is_tool_result: true,
        }
    }

    /// Shorthand for a `"success"` result
    pub fn success(content: impl Into<String>) -> Self {
        Self::new("success", content)
    }

    /// Shorthand for an `"error"` result
    pub fn error(content: impl Into<String>) -> Self {
        Self::new("error", content)
    }

    /// Attach a structured action
    pub fn with_action(mut self, action: Value) -> Self {
        self.action = Some(action);
        self
    }

    /// Mark the result as not produced by a tool
    pub fn not_tool_result(mut self) -> Self {
        self.is_tool_result = false;
        self
    }

    /// Full form with every field
    pub fn to_value(&self) -> Value {
        json!({
            "status": self.status,
            "content": self.content,
            "action": self.action,
            "is_tool_result": self.is_tool_result,
        })
    }
}

impl fmt::Display for ToolResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = json!({ "status": self.status, "content": self.content });
        write!(f, "{shown}")
    }
}

/// What a tool call hands back to the dispatch loop
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Plain text
    Text(String),
    /// Structured result
    Structured(ToolResult),
}

impl ToolOutput {
    /// The structured result, if this is one
    pub fn as_result(&self) -> Option<&ToolResult> {
        match self {
            ToolOutput::Structured(result) => Some(result),
            ToolOutput::Text(_) => None,
        }
    }
}

impl fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolOutput::Text(text) => f.write_str(text),
            ToolOutput::Structured(result) => result.fmt(f),
        }
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        ToolOutput::Text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        ToolOutput::Text(text.to_string())
    }
}

impl From<ToolResult> for ToolOutput {
    fn from(result: ToolResult) -> Self {
        ToolOutput::Structured(result)
    }
}
