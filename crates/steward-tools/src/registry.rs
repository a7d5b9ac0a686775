//! Tool registry mapping names to constructors
//!
//! Tools are registered explicitly, as a `(ToolSpec, constructor)` pair.
//! Instantiating a tool builds its [`ToolBase`] from the configuration and
//! hands it to the constructor.

use crate::{Tool, ToolBase, ToolSpec};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use steward_core::{Error, Result};
use steward_utils::Config;
use tracing::{debug, warn};

/// Builds a tool instance from its configured base
pub type ToolConstructor = Arc<dyn Fn(ToolBase) -> Result<Arc<dyn Tool>> + Send + Sync>;

/// A registered tool type
#[derive(Clone)]
pub struct ToolEntry {
    spec: Arc<ToolSpec>,
    constructor: ToolConstructor,
}

impl ToolEntry {
    /// The tool's spec
    pub fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    /// Configure a base from `config` and construct the tool
    pub fn instantiate(&self, config: &Config) -> Result<Arc<dyn Tool>> {
        let base = ToolBase::new(self.spec.clone(), config)?;
        (self.constructor)(base)
    }
}

impl fmt::Debug for ToolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolEntry")
            .field("name", &self.spec.name)
            .finish_non_exhaustive()
    }
}

/// Registry for managing tool types
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use steward_tools::{Tool, ToolBase, ToolRegistry, ToolSpec};
///
/// struct Noop(ToolBase);
///
/// impl Tool for Noop {
///     fn base(&self) -> &ToolBase {
///         &self.0
///     }
/// }
///
/// let registry = ToolRegistry::new();
/// registry.register(
///     ToolSpec::new("noop", "Does nothing").with_qualified_path("demo.tools.Noop"),
///     |base| Ok(Arc::new(Noop(base)) as Arc<dyn Tool>),
/// );
///
/// let (name, _) = registry.resolve("demo.tools.Noop").unwrap();
/// assert_eq!(name, "noop");
/// ```
#[derive(Default)]
pub struct ToolRegistry {
    entries: RwLock<HashMap<String, ToolEntry>>,
    aliases: RwLock<HashMap<String, String>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool type
    ///
    /// A name that is already registered is replaced.
    pub fn register<F>(&self, spec: ToolSpec, constructor: F)
    where
        F: Fn(ToolBase) -> Result<Arc<dyn Tool>> + Send + Sync + 'static,
    {
        let name = spec.name.clone();
        if let Some(path) = &spec.qualified_path {
            self.aliases
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(path.clone(), name.clone());
        }

        let entry = ToolEntry {
            spec: Arc::new(spec),
            constructor: Arc::new(constructor),
        };
        let previous = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), entry);

        if previous.is_some() {
            warn!(tool = %name, "Tool registered twice, replacing previous registration");
        } else {
            debug!(tool = %name, "Registered tool");
        }
    }

    /// Get a tool type by canonical name
    pub fn get(&self, name: &str) -> Option<ToolEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Look a tool up by name or qualified path
    ///
    /// A name containing `.` is treated as a qualified path. Returns the
    /// canonical name with the entry.
    pub fn resolve(&self, name: &str) -> Result<(String, ToolEntry)> {
        let canonical = if name.contains('.') {
            self.aliases
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(name)
                .cloned()
                .ok_or_else(|| Error::UnknownToolPath(name.to_string()))?
        } else {
            name.to_string()
        };

        let entry = self
            .get(&canonical)
            .ok_or_else(|| Error::UnknownTool(canonical.clone()))?;
        Ok((canonical, entry))
    }

    /// Resolve `name` and construct the tool from `config`
    pub fn instantiate(&self, name: &str, config: &Config) -> Result<Arc<dyn Tool>> {
        let (_, entry) = self.resolve(name)?;
        entry.instantiate(config)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolOutput;
    use async_trait::async_trait;
    use serde_json::{Map, Value, json};
    use tempfile::TempDir;

    struct Fixed {
        base: ToolBase,
        reply: &'static str,
    }

    #[async_trait]
    impl Tool for Fixed {
        fn base(&self) -> &ToolBase {
            &self.base
        }

        async fn call(&self, _arguments: Map<String, Value>) -> Result<ToolOutput> {
            Ok(ToolOutput::from(self.reply))
        }
    }

    fn register_fixed(registry: &ToolRegistry, spec: ToolSpec, reply: &'static str) {
        registry.register(spec, move |base| {
            Ok(Arc::new(Fixed { base, reply }) as Arc<dyn Tool>)
        });
    }

    fn config(dir: &TempDir) -> Config {
        let mut config = Config::new();
        config.set("log.dir", json!(dir.path().to_string_lossy()));
        config
    }

    #[test]
    fn test_register_and_get() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());

        register_fixed(&registry, ToolSpec::new("alpha", "A"), "a");
        register_fixed(&registry, ToolSpec::new("beta", "B"), "b");

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("alpha").unwrap().spec().description, "A");
        assert_eq!(registry.get("beta").unwrap().spec().description, "B");
        assert!(registry.get("gamma").is_none());
        assert_eq!(registry.names(), vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn test_reregistration_overwrites() {
        let dir = TempDir::new().unwrap();
        let registry = ToolRegistry::new();
        register_fixed(&registry, ToolSpec::new("alpha", "first"), "one");
        register_fixed(&registry, ToolSpec::new("alpha", "second"), "two");

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("alpha").unwrap().spec().description, "second");

        let tool = registry.instantiate("alpha", &config(&dir)).unwrap();
        let output = tokio_test::block_on(tool.call(Map::new())).unwrap();
        assert_eq!(output.to_string(), "two");
    }

    #[test]
    fn test_resolve_qualified_path() {
        let registry = ToolRegistry::new();
        register_fixed(
            &registry,
            ToolSpec::new("alpha", "A").with_qualified_path("steward.tools.demo.Alpha"),
            "a",
        );

        let (name, entry) = registry.resolve("steward.tools.demo.Alpha").unwrap();
        assert_eq!(name, "alpha");
        assert_eq!(entry.spec().name, "alpha");

        assert!(matches!(
            registry.resolve("steward.tools.demo.Missing"),
            Err(Error::UnknownToolPath(path)) if path == "steward.tools.demo.Missing"
        ));
        assert!(matches!(
            registry.resolve("missing"),
            Err(Error::UnknownTool(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_instantiate_applies_config() {
        let dir = TempDir::new().unwrap();
        let registry = ToolRegistry::new();
        register_fixed(
            &registry,
            ToolSpec::new("alpha", "A")
                .with_config_item(crate::ConfigItem::required("alpha.token").map_to("token")),
            "a",
        );

        let missing = registry.instantiate("alpha", &config(&dir));
        assert!(matches!(missing, Err(Error::MissingConfig { .. })));

        let mut config = config(&dir);
        config.set("alpha.token", json!("secret"));
        let tool = registry.instantiate("alpha", &config).unwrap();
        assert_eq!(tool.base().attribute("token"), Some(&json!("secret")));
        assert!(tool.schema().is_ok());
    }
}
