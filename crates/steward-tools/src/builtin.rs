//! Tools shipped with the crate

use crate::schema::param;
use crate::tool::optional_argument;
use crate::{ConfigItem, Tool, ToolBase, ToolOutput, ToolRegistry, ToolSpec};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use steward_core::Result;

/// Name of [`ListAllTools`]
pub const LIST_ALL_TOOLS: &str = "list_all_tools";

/// Register every built-in tool
pub fn register_builtin_tools(registry: &ToolRegistry) {
    registry.register(ListAllTools::spec(), |base| {
        Ok(Arc::new(ListAllTools::new(base)?) as Arc<dyn Tool>)
    });
}

/// Reports the tools enabled in the configuration (`tool_names`)
pub struct ListAllTools {
    base: ToolBase,
    tool_names: Vec<String>,
}

impl ListAllTools {
    /// Spec: optional `format` flag, requires `tool_names` in the config
    pub fn spec() -> ToolSpec {
        ToolSpec::new(LIST_ALL_TOOLS, "List the currently enabled tools")
            .with_parameter("format", param::boolean("Print one tool per line"))
            .with_config_item(ConfigItem::required("tool_names"))
            .with_qualified_path("steward_tools.builtin.ListAllTools")
    }

    /// Build from a configured base
    pub fn new(base: ToolBase) -> Result<Self> {
        let tool_names = base.attribute_as("tool_names")?.unwrap_or_default();
        Ok(Self { base, tool_names })
    }
}

#[async_trait]
impl Tool for ListAllTools {
    fn base(&self) -> &ToolBase {
        &self.base
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<ToolOutput> {
        let format: bool = optional_argument(self.name(), &arguments, "format")?.unwrap_or(false);

        let listing = if format {
            self.tool_names
                .iter()
                .map(|name| format!("- {name}"))
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            format!("{:?}", self.tool_names)
        };
        self.base.log(steward_utils::LogLevel::Info, &listing);

        Ok(if format {
            ToolOutput::Text(format!("Enabled tools:\n{listing}"))
        } else {
            ToolOutput::Text(format!("Enabled tools: {listing}"))
        })
    }
}
