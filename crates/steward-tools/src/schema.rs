//! Function-calling export of a tool
//!
//! [`ToolSchema`] serializes to the OpenAI `tools` entry format:
//!
//! ```json
//! {"type": "function",
//!  "function": {"name": "...", "description": "...",
//!               "parameters": {"type": "object", "properties": {...}, "required": [...]}}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Exported description of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Always `"function"`
    #[serde(rename = "type")]
    pub kind: String,
    /// The function being described
    pub function: FunctionSchema,
}

/// Name, description and parameters of a callable tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSchema {
    /// Tool name
    pub name: String,
    /// What the tool does
    pub description: String,
    /// Parameter object schema
    pub parameters: ParametersSchema,
}

/// Object schema for a tool's arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParametersSchema {
    /// Always `"object"`
    #[serde(rename = "type")]
    pub kind: String,
    /// Parameter name to parameter schema
    pub properties: Map<String, Value>,
    /// Names of parameters without defaults
    pub required: Vec<String>,
}

impl ToolSchema {
    /// Build the export for a function
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        properties: Map<String, Value>,
        required: Vec<String>,
    ) -> Self {
        Self {
            kind: "function".to_string(),
            function: FunctionSchema {
                name: name.into(),
                description: description.into(),
                parameters: ParametersSchema {
                    kind: "object".to_string(),
                    properties,
                    required,
                },
            },
        }
    }

    /// Export as a JSON value
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Parameter object schema as a JSON value
    pub fn parameters_value(&self) -> Value {
        serde_json::to_value(&self.function.parameters).unwrap_or(Value::Null)
    }
}

/// Helpers to build parameter schemas
///
/// # Example
///
/// ```
/// use steward_tools::schema::param;
///
/// let entity = param::string("Entity id, e.g. light.desk");
/// assert_eq!(entity["type"], "string");
/// ```
pub mod param {
    use serde_json::{Value, json};

    /// String parameter schema
    pub fn string(description: &str) -> Value {
        json!({
            "type": "string",
            "description": description,
        })
    }

    /// String parameter restricted to the given values
    pub fn enumeration(description: &str, values: &[&str]) -> Value {
        json!({
            "type": "string",
            "description": description,
            "enum": values,
        })
    }

    /// Number parameter schema
    pub fn number(description: &str) -> Value {
        json!({
            "type": "number",
            "description": description,
        })
    }

    /// Integer parameter schema
    pub fn integer(description: &str) -> Value {
        json!({
            "type": "integer",
            "description": description,
        })
    }

    /// Boolean parameter schema
    pub fn boolean(description: &str) -> Value {
        json!({
            "type": "boolean",
            "description": description,
        })
    }

    /// Array parameter schema
    pub fn array(description: &str, items: Value) -> Value {
        json!({
            "type": "array",
            "description": description,
            "items": items,
        })
    }
}
