//! Tool agent: an agent assembled from configuration that is also a tool

use crate::executor::{AgentExecutor, DEFAULT_SYSTEM_PROMPT, DispatchOutcome};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use steward_core::{Agent, Result};
use steward_llm::providers::{OpenAIConfig, OpenAIProvider};
use steward_llm::{JsonFixer, LLMProvider};
use steward_tools::schema::param;
use steward_tools::{Tool, ToolBase, ToolOutput, ToolRegistry, ToolSpec, required_argument};
use steward_utils::{Config, LogLevel};
use tracing::info;

/// An agent that dispatches a query to its tools through the LLM
///
/// A `ToolAgent` is itself a [`Tool`] taking a single `query` argument, so
/// it can be handed to another agent.
///
/// # Example
///
/// ```no_run
/// use steward_core::Agent;
/// use steward_runtime::ToolAgent;
/// use steward_tools::{ToolRegistry, register_builtin_tools};
/// use steward_utils::Config;
///
/// # async fn example() -> steward_core::Result<()> {
/// let config = Config::from_json_file("config.json")?;
/// let registry = ToolRegistry::new();
/// register_builtin_tools(&registry);
///
/// let agent = ToolAgent::builder("butler").build(&config, &registry)?;
/// let answer = agent.process("Which tools do you have?".to_string()).await?;
/// # Ok(())
/// # }
/// ```
pub struct ToolAgent {
    base: ToolBase,
    executor: AgentExecutor,
}

impl ToolAgent {
    /// Start building an agent named `name`
    pub fn builder(name: impl Into<String>) -> ToolAgentBuilder {
        ToolAgentBuilder::new(name)
    }

    /// Get a reference to the underlying executor
    pub fn executor(&self) -> &AgentExecutor {
        &self.executor
    }

    /// Model the agent talks to
    pub fn model(&self) -> &str {
        &self.executor.config().model
    }

    /// Dispatch a query and keep the structured outcome
    pub async fn dispatch(&self, query: String) -> Result<DispatchOutcome> {
        self.base.log(LogLevel::Info, format!("Query: {query}"));
        self.executor.run_detailed(query).await
    }
}

#[async_trait]
impl Agent for ToolAgent {
    async fn process(&self, input: String) -> Result<String> {
        Ok(self.dispatch(input).await?.into_text())
    }

    fn name(&self) -> &str {
        self.base.name()
    }
}

#[async_trait]
impl Tool for ToolAgent {
    fn base(&self) -> &ToolBase {
        &self.base
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<ToolOutput> {
        let query: String = required_argument(self.base.name(), &arguments, "query")?;
        Ok(ToolOutput::Text(self.process(query).await?))
    }
}

/// Builder for [`ToolAgent`]
///
/// Credentials and model are looked up through lists of config paths, first
/// match wins. A provider or resolver set on the builder is used as is.
pub struct ToolAgentBuilder {
    spec: ToolSpec,
    api_key_sources: Vec<String>,
    base_url_sources: Vec<String>,
    model_sources: Vec<String>,
    provider: Option<Arc<dyn LLMProvider>>,
    resolver: Option<Arc<JsonFixer>>,
    tools: Vec<Arc<dyn Tool>>,
    system_prompt: Option<String>,
}

impl ToolAgentBuilder {
    /// Create a builder with the default config sources
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let description = format!("Agent {name}: hand it a request in natural language");
        Self {
            spec: ToolSpec::new(name, description)
                .with_required_parameter("query", param::string("Request for the agent")),
            api_key_sources: vec!["openai_api_key".to_string()],
            base_url_sources: vec!["openai_api_base".to_string()],
            model_sources: vec!["model".to_string()],
            provider: None,
            resolver: None,
            tools: Vec::new(),
            system_prompt: None,
        }
    }

    /// Description shown when the agent is offered as a tool
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = description.into();
        self
    }

    /// Config paths tried for the API key
    pub fn api_key_sources(mut self, sources: &[&str]) -> Self {
        self.api_key_sources = sources.iter().map(ToString::to_string).collect();
        self
    }

    /// Config paths tried for the API base URL
    pub fn base_url_sources(mut self, sources: &[&str]) -> Self {
        self.base_url_sources = sources.iter().map(ToString::to_string).collect();
        self
    }

    /// Config paths tried for the model name
    pub fn model_sources(mut self, sources: &[&str]) -> Self {
        self.model_sources = sources.iter().map(ToString::to_string).collect();
        self
    }

    /// Use this provider instead of building one from the config
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Share an existing argument resolver
    pub fn resolver(mut self, resolver: Arc<JsonFixer>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Add a tool next to the ones named in `tool_names`
    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Override `system_prompt` from the config
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Build the agent
    ///
    /// Instantiates every tool listed in the config's `tool_names` from
    /// `registry`; an unknown name or a missing required binding fails.
    pub fn build(self, config: &Config, registry: &ToolRegistry) -> Result<ToolAgent> {
        let model = config
            .get_str_with_fallback(&as_strs(&self.model_sources))?
            .to_string();

        let provider = match self.provider {
            Some(provider) => provider,
            None => {
                let api_key = config.get_str_with_fallback(&as_strs(&self.api_key_sources))?;
                let mut openai = OpenAIConfig::new(api_key);
                if let Ok(api_base) =
                    config.get_str_with_fallback(&as_strs(&self.base_url_sources))
                {
                    openai = openai.with_api_base(api_base);
                }
                Arc::new(OpenAIProvider::with_config(openai)?) as Arc<dyn LLMProvider>
            }
        };

        let resolver = match self.resolver {
            Some(resolver) => resolver,
            None => Arc::new(JsonFixer::from_config(config)?),
        };

        let mut tools = Vec::new();
        for name in config.get_as::<Vec<String>>("tool_names")?.unwrap_or_default() {
            tools.push(registry.instantiate(&name, config)?);
        }
        tools.extend(self.tools);

        let system_prompt = self
            .system_prompt
            .or_else(|| config.get_str("system_prompt").map(str::to_string))
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        let base = ToolBase::new(self.spec, config)?.with_log_suffix(&model.replace('/', "_"));

        let mut executor = AgentExecutor::builder()
            .provider(provider)
            .resolver(resolver)
            .tools(tools)
            .model(model)
            .system_prompt(system_prompt);
        if let Some(logger) = base.logger() {
            executor = executor.logger(logger.clone());
        }
        let executor = executor.build()?;

        info!(
            agent = %base.name(),
            model = %executor.config().model,
            tools = executor.tools().len(),
            "Agent ready"
        );

        Ok(ToolAgent { base, executor })
    }
}

fn as_strs(sources: &[String]) -> Vec<&str> {
    sources.iter().map(String::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::NO_OPERATION;
    use crate::executor::tests::ScriptedProvider;
    use serde_json::json;
    use steward_core::Error;
    use steward_llm::{FunctionCall, Message};
    use steward_tools::register_builtin_tools;
    use tempfile::TempDir;

    fn config(dir: &TempDir, extra: Value) -> Config {
        let mut config = Config::from_value(extra).unwrap();
        config.set("log.dir", json!(dir.path().to_string_lossy()));
        config
    }

    fn registry() -> ToolRegistry {
        let registry = ToolRegistry::new();
        register_builtin_tools(&registry);
        registry
    }

    fn fixer() -> Arc<JsonFixer> {
        Arc::new(JsonFixer::new(ScriptedProvider::text(&[]), "fixer-model"))
    }

    #[tokio::test]
    async fn test_builds_tools_from_config() {
        let dir = TempDir::new().unwrap();
        let config = config(
            &dir,
            json!({
                "model": "qwen/qwen2.5-7b",
                "tool_names": ["list_all_tools"],
                "system_prompt": "You are a home butler."
            }),
        );
        let provider = ScriptedProvider::new(vec![Message::assistant_with_calls(
            None,
            vec![FunctionCall::new("call_0", "list_all_tools", r#"{"format": false"#)],
        )]);

        let agent = ToolAgent::builder("butler")
            .provider(provider.clone())
            .resolver(fixer())
            .build(&config, &registry())
            .unwrap();

        assert_eq!(Agent::name(&agent), "butler");
        assert_eq!(agent.model(), "qwen/qwen2.5-7b");
        assert!(
            agent
                .base()
                .logger()
                .unwrap()
                .path()
                .to_string_lossy()
                .ends_with("-qwen_qwen2.5-7b.log")
        );

        let answer = agent.process("What can you do?".to_string()).await.unwrap();
        assert_eq!(answer, r#"Enabled tools: ["list_all_tools"]"#);

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].model, "qwen/qwen2.5-7b");
        assert_eq!(requests[0].messages[0].text(), Some("You are a home butler."));
    }

    #[tokio::test]
    async fn test_agent_as_tool() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, json!({"model": "gpt-4o"}));
        let agent = ToolAgent::builder("helper")
            .provider(ScriptedProvider::text(&["Happy to help."]))
            .resolver(fixer())
            .build(&config, &registry())
            .unwrap();

        let schema = Tool::schema(&agent).unwrap();
        assert_eq!(schema.function.name, "helper");
        assert_eq!(schema.function.parameters.required, vec!["query".to_string()]);

        let mut arguments = Map::new();
        arguments.insert("query".to_string(), json!("Hi"));
        let output = agent.call(arguments).await.unwrap();
        assert_eq!(output.to_string(), "Happy to help.");

        assert!(agent.call(Map::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_nested_agent_dispatch() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, json!({"model": "gpt-4o"}));
        let inner = ToolAgent::builder("helper")
            .provider(ScriptedProvider::text(&["Done inside."]))
            .resolver(fixer())
            .build(&config, &registry())
            .unwrap();

        let outer = ToolAgent::builder("butler")
            .provider(ScriptedProvider::new(vec![Message::assistant_with_calls(
                None,
                vec![FunctionCall::new("call_0", "helper", r#"{"query": "tidy up"}"#)],
            )]))
            .resolver(fixer())
            .tool(Arc::new(inner))
            .build(&config, &registry())
            .unwrap();

        assert_eq!(outer.process("Go".to_string()).await.unwrap(), "Done inside.");
    }

    #[test]
    fn test_model_source_override() {
        let dir = TempDir::new().unwrap();
        let config = config(
            &dir,
            json!({"model": "gpt-4o", "butler": {"model": "gpt-4o-mini"}}),
        );

        let agent = ToolAgent::builder("butler")
            .model_sources(&["butler.model", "model"])
            .provider(ScriptedProvider::text(&[]))
            .resolver(fixer())
            .build(&config, &registry())
            .unwrap();
        assert_eq!(agent.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_missing_model_fails() {
        let dir = TempDir::new().unwrap();
        let result = ToolAgent::builder("butler")
            .provider(ScriptedProvider::text(&[]))
            .resolver(fixer())
            .build(&config(&dir, json!({})), &registry());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_tool_name_fails() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, json!({"model": "gpt-4o", "tool_names": ["teleport"]}));
        let result = ToolAgent::builder("butler")
            .provider(ScriptedProvider::text(&[]))
            .resolver(fixer())
            .build(&config, &registry());
        assert!(matches!(result, Err(Error::UnknownTool(name)) if name == "teleport"));
    }

    #[test]
    fn test_builds_provider_and_resolver_from_config() {
        let dir = TempDir::new().unwrap();
        let config = config(
            &dir,
            json!({
                "model": "gpt-4o",
                "openai_api_key": "sk-test",
                "openai_api_base": "http://localhost:1234/v1"
            }),
        );

        let agent = ToolAgent::builder("butler").build(&config, &registry()).unwrap();
        assert_eq!(agent.model(), "gpt-4o");
        assert!(agent.executor().tools().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_reports_no_operation() {
        let dir = TempDir::new().unwrap();
        let agent = ToolAgent::builder("butler")
            .provider(ScriptedProvider::new(vec![Message::assistant_with_calls(
                Some("Sure".to_string()),
                vec![FunctionCall::new("call_0", "list_all_tools", "{}")],
            )]))
            .resolver(fixer())
            .build(&config(&dir, json!({"model": "gpt-4o"})), &registry())
            .unwrap();

        let outcome = agent.dispatch("hi".to_string()).await.unwrap();
        assert_eq!(outcome.into_text(), NO_OPERATION);
    }
}
