//! Tool trait definition and the shared tool base
//!
//! A tool is described by a [`ToolSpec`] (name, description, parameters,
//! supported OSes, config bindings). Constructing a [`ToolBase`] from a spec
//! and a [`Config`] applies the bindings, opens the tool's log sink and makes
//! the schema available. Concrete tools hold a `ToolBase` and implement
//! [`Tool::call`].

use crate::os::Os;
use crate::result::ToolOutput;
use crate::schema::ToolSchema;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use steward_core::{Error, Result};
use steward_utils::logging::emit;
use steward_utils::{Config, LogLevel, LogSettings, ToolLogger};
use tracing::debug;

/// Rule copying a configuration value onto a tool at construction
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigItem {
    /// Dotted configuration path to read
    pub key: String,
    /// Value used when the path is unset
    pub default: Value,
    /// Fail construction when the path is unset
    pub required: bool,
    /// Attribute name on the tool (defaults to `key`)
    pub map_to: Option<String>,
}

impl ConfigItem {
    /// A binding that must be present in the configuration
    pub fn required(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            default: Value::Null,
            required: true,
            map_to: None,
        }
    }

    /// A binding that falls back to `default`
    pub fn optional(key: impl Into<String>, default: Value) -> Self {
        Self {
            key: key.into(),
            default,
            required: false,
            map_to: None,
        }
    }

    /// Store the value under a different attribute name
    pub fn map_to(mut self, attribute: impl Into<String>) -> Self {
        self.map_to = Some(attribute.into());
        self
    }

    /// Attribute name the value is stored under
    pub fn target(&self) -> &str {
        self.map_to.as_deref().unwrap_or(&self.key)
    }
}

/// Static description of a tool type
///
/// # Example
///
/// ```
/// use steward_tools::{ConfigItem, Os, ToolSpec};
/// use steward_tools::schema::param;
///
/// let spec = ToolSpec::new("turn_on", "Turn on a device")
///     .with_required_parameter("entity_id", param::string("Entity to switch"))
///     .with_parameter("brightness", param::integer("0-255"))
///     .with_support_os(vec![Os::Linux])
///     .with_config_item(ConfigItem::required("hass.token").map_to("token"));
///
/// assert_eq!(spec.required, vec!["entity_id".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    /// Unique name, used in function calls
    pub name: String,
    /// What the tool does, shown to the model
    pub description: String,
    /// Parameter name to parameter schema
    pub parameters: Map<String, Value>,
    /// Parameters the caller must supply
    pub required: Vec<String>,
    /// OSes the tool runs on
    pub support_os: Vec<Os>,
    /// Configuration bindings applied at construction
    pub config_items: Vec<ConfigItem>,
    /// Dotted alias resolvable through the registry
    pub qualified_path: Option<String>,
}

impl ToolSpec {
    /// Create a spec supported on every OS, with no parameters
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Map::new(),
            required: Vec::new(),
            support_os: Os::ALL.to_vec(),
            config_items: Vec::new(),
            qualified_path: None,
        }
    }

    /// Declare an optional parameter
    pub fn with_parameter(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.parameters.insert(name.into(), schema);
        self
    }

    /// Declare a parameter the caller must supply
    pub fn with_required_parameter(mut self, name: impl Into<String>, schema: Value) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.parameters.insert(name, schema);
        self
    }

    /// Restrict the tool to the given OSes
    pub fn with_support_os(mut self, support_os: Vec<Os>) -> Self {
        self.support_os = support_os;
        self
    }

    /// Add a configuration binding
    pub fn with_config_item(mut self, item: ConfigItem) -> Self {
        self.config_items.push(item);
        self
    }

    /// Make the tool resolvable by a dotted path as well as by name
    pub fn with_qualified_path(mut self, path: impl Into<String>) -> Self {
        self.qualified_path = Some(path.into());
        self
    }

    /// Whether the tool runs on `os`
    pub fn supports(&self, os: Os) -> bool {
        self.support_os.contains(&os)
    }
}

/// State shared by every tool instance
///
/// Built by [`ToolBase::new`], which applies the spec's config bindings and
/// opens the log sink. A base from [`ToolBase::declared`] has skipped that
/// step and refuses to export a schema.
#[derive(Clone)]
pub struct ToolBase {
    spec: Arc<ToolSpec>,
    attributes: Map<String, Value>,
    logger: Option<ToolLogger>,
}

impl ToolBase {
    /// Wrap a spec without configuring it
    pub fn declared(spec: impl Into<Arc<ToolSpec>>) -> Self {
        Self {
            spec: spec.into(),
            attributes: Map::new(),
            logger: None,
        }
    }

    /// Construct and configure a tool base
    ///
    /// Fails with [`Error::MissingConfig`] when a required binding's key is
    /// unset (or `null`).
    pub fn new(spec: impl Into<Arc<ToolSpec>>, config: &Config) -> Result<Self> {
        let spec = spec.into();
        let mut attributes = Map::new();

        for item in &spec.config_items {
            let value = match config.get(&item.key) {
                Some(value) => value.clone(),
                None if item.required => {
                    return Err(Error::MissingConfig {
                        tool: spec.name.clone(),
                        key: item.key.clone(),
                    });
                }
                None => item.default.clone(),
            };
            debug!(
                tool = %spec.name,
                attribute = item.target(),
                value = %value,
                "Bound config value"
            );
            attributes.insert(item.target().to_string(), value);
        }

        let logger = ToolLogger::new(spec.name.clone(), &LogSettings::from_config(config));

        Ok(Self {
            spec,
            attributes,
            logger: Some(logger),
        })
    }

    /// Append `-<suffix>` to the log file name
    pub fn with_log_suffix(mut self, suffix: &str) -> Self {
        self.logger = self.logger.map(|logger| logger.with_suffix(suffix));
        self
    }

    /// The tool's spec
    pub fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    /// Tool name
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Whether construction completed
    pub fn is_initialized(&self) -> bool {
        self.logger.is_some()
    }

    /// Bound attribute value; `null` counts as unset
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).filter(|value| !value.is_null())
    }

    /// Bound attribute deserialized into `T`
    pub fn attribute_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        self.attribute(name)
            .map(|value| T::deserialize(value))
            .transpose()
            .map_err(|e| Error::Config(e.into()))
    }

    /// The tool's log sink, once constructed
    pub fn logger(&self) -> Option<&ToolLogger> {
        self.logger.as_ref()
    }

    /// Log through the tool's sink, or straight to `tracing` before construction
    pub fn log(&self, level: LogLevel, message: impl fmt::Display) {
        match &self.logger {
            Some(logger) => logger.log(level, message),
            None => emit(level, &self.spec.name, &message),
        }
    }

    /// Whether the current OS is in the supported set
    pub fn is_supported(&self) -> bool {
        self.spec.supports(Os::current())
    }

    /// Function-calling export
    ///
    /// Fails with [`Error::Uninitialized`] for a declared-only base and
    /// with [`Error::UnsupportedOs`] on an unsupported OS.
    pub fn schema(&self) -> Result<ToolSchema> {
        if !self.is_initialized() {
            return Err(Error::Uninitialized(self.spec.name.clone()));
        }
        let os = Os::current();
        if !self.spec.supports(os) {
            return Err(Error::UnsupportedOs {
                tool: self.spec.name.clone(),
                os: os.to_string(),
                supported: self
                    .spec
                    .support_os
                    .iter()
                    .map(|os| os.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        Ok(ToolSchema::function(
            self.spec.name.clone(),
            self.spec.description.clone(),
            self.spec.parameters.clone(),
            self.spec.required.clone(),
        ))
    }
}

impl fmt::Debug for ToolBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolBase")
            .field("name", &self.spec.name)
            .field("initialized", &self.is_initialized())
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

/// Trait for tools that agents can execute
///
/// Tools are functions that LLM agents can call to interact with the world.
/// Name, description and schema come from the tool's [`ToolBase`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// Shared state built from the tool's spec
    fn base(&self) -> &ToolBase;

    /// Get the tool's name
    ///
    /// Must be unique within a registry and match the name in function calls.
    fn name(&self) -> &str {
        self.base().name()
    }

    /// Get the tool's description
    fn description(&self) -> &str {
        &self.base().spec().description
    }

    /// Execute the tool with resolved arguments
    async fn call(&self, arguments: Map<String, Value>) -> Result<ToolOutput> {
        let _ = arguments;
        Err(Error::NotImplemented(self.name().to_string()))
    }

    /// Whether the tool runs on the current OS
    fn is_supported(&self) -> bool {
        self.base().is_supported()
    }

    /// Function-calling export, see [`ToolBase::schema`]
    fn schema(&self) -> Result<ToolSchema> {
        self.base().schema()
    }
}

/// Read an optional argument, failing if it has the wrong type
pub fn optional_argument<T: DeserializeOwned>(
    tool: &str,
    arguments: &Map<String, Value>,
    key: &str,
) -> Result<Option<T>> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => T::deserialize(value)
            .map(Some)
            .map_err(|e| Error::InvalidArguments {
                tool: tool.to_string(),
                reason: format!("{key}: {e}"),
            }),
    }
}

/// Read an argument the caller must supply
pub fn required_argument<T: DeserializeOwned>(
    tool: &str,
    arguments: &Map<String, Value>,
    key: &str,
) -> Result<T> {
    optional_argument(tool, arguments, key)?.ok_or_else(|| Error::InvalidArguments {
        tool: tool.to_string(),
        reason: format!("missing required argument '{key}'"),
    })
}
