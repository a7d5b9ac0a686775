//! Agent executor: one LLM round, then dispatch of the requested tool calls
//!
//! The executor sends `[system, user]` with the tool schemas attached and
//! reads the reply:
//! 1. Text with no tool calls is the answer.
//! 2. Text together with tool calls, or neither, means nothing was done.
//! 3. Otherwise each call is dispatched in order: look the tool up, resolve
//!    its arguments through the shared [`JsonFixer`], invoke it. A failing
//!    step is logged and the call skipped; the batch always runs to the end.
//!
//! There is no second round trip: tool outputs are returned to the caller,
//! not fed back to the model.

use std::fmt;
use std::sync::Arc;
use steward_core::{Error, Result};
use steward_llm::{
    CompletionRequest, FunctionCall, JsonFixer, LLMProvider, Message, ToolDefinition,
};
use steward_tools::{Os, Tool, ToolOutput};
use steward_utils::logging::emit;
use steward_utils::{LogLevel, ToolLogger};
use tracing::{info, instrument};

/// Reply used when the model's answer led to no action
pub const NO_OPERATION: &str = "No operation was performed";

/// Default system prompt
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// What a single dispatch produced
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The model answered in text
    Reply(String),
    /// Nothing was executed
    NoOperation,
    /// Outputs of the tool calls that succeeded, in call order
    ToolOutputs(Vec<ToolOutput>),
}

impl DispatchOutcome {
    /// Text form: the reply, [`NO_OPERATION`], or the outputs joined by `\n`
    pub fn into_text(self) -> String {
        match self {
            DispatchOutcome::Reply(text) => text,
            DispatchOutcome::NoOperation => NO_OPERATION.to_string(),
            DispatchOutcome::ToolOutputs(outputs) => outputs
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clone().into_text())
    }
}

/// Configuration for agent execution
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Model to use
    pub model: String,

    /// System prompt
    pub system_prompt: String,

    /// Max tokens per completion (provider default when unset)
    pub max_tokens: Option<usize>,

    /// Temperature (provider default when unset)
    pub temperature: Option<f32>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: None,
            temperature: None,
        }
    }
}

/// Executes the dispatch loop against a fixed set of tools
pub struct AgentExecutor {
    provider: Arc<dyn LLMProvider>,
    resolver: Arc<JsonFixer>,
    tools: Vec<Arc<dyn Tool>>,
    config: ExecutorConfig,
    logger: Option<ToolLogger>,
}

impl AgentExecutor {
    /// Create a new agent executor
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        resolver: Arc<JsonFixer>,
        tools: Vec<Arc<dyn Tool>>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            provider,
            resolver,
            tools,
            config,
            logger: None,
        }
    }

    /// Create a builder
    pub fn builder() -> AgentExecutorBuilder {
        AgentExecutorBuilder::new()
    }

    /// Write dispatch logs to `logger` as well as `tracing`
    pub fn with_logger(mut self, logger: ToolLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Execution settings
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Tools the model may call
    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    /// Run a query and return the text form of the outcome
    pub async fn run(&self, query: String) -> Result<String> {
        Ok(self.run_detailed(query).await?.into_text())
    }

    /// Run a query and return the structured outcome
    ///
    /// Errors from the chat endpoint (including during argument repair)
    /// propagate; everything else degrades into the outcome.
    #[instrument(skip(self, query), fields(model = %self.config.model))]
    pub async fn run_detailed(&self, query: String) -> Result<DispatchOutcome> {
        self.log(LogLevel::Debug, format!("System prompt: {}", self.config.system_prompt));

        let tools = self.tool_definitions();
        let mut builder = CompletionRequest::builder(&self.config.model)
            .add_message(Message::system(self.config.system_prompt.clone()))
            .add_message(Message::user(query));
        if let Some(max_tokens) = self.config.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }
        if let Some(temperature) = self.config.temperature {
            builder = builder.temperature(temperature);
        }
        if !tools.is_empty() {
            builder = builder.tools(tools);
        }

        let response = self.provider.complete(builder.build()).await?;
        info!(
            stop_reason = ?response.stop_reason,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "LLM response received"
        );
        self.log(LogLevel::Debug, format!("Full response: {:?}", response.message));

        let calls = response.message.function_calls();
        if let Some(text) = response.message.text().filter(|text| !text.is_empty()) {
            self.log(LogLevel::Debug, format!("Answer: {text}"));
            return Ok(if calls.is_empty() {
                DispatchOutcome::Reply(text.to_string())
            } else {
                DispatchOutcome::NoOperation
            });
        }

        if calls.is_empty() {
            return Ok(DispatchOutcome::NoOperation);
        }

        let mut outputs = Vec::new();
        for call in calls {
            if let Some(output) = self.dispatch(call).await? {
                outputs.push(output);
            }
        }

        info!(executed = outputs.len(), "Tool dispatch finished");
        Ok(if outputs.is_empty() {
            DispatchOutcome::NoOperation
        } else {
            DispatchOutcome::ToolOutputs(outputs)
        })
    }

    /// Run one function call; `None` when it was skipped
    async fn dispatch(&self, call: FunctionCall) -> Result<Option<ToolOutput>> {
        let Some(tool) = self.tools.iter().find(|tool| tool.name() == call.name) else {
            self.log(LogLevel::Error, format!("Tool {} does not exist", call.name));
            return Ok(None);
        };
        if !tool.is_supported() {
            self.log(
                LogLevel::Error,
                format!("Tool {} is not supported on {}", call.name, Os::current()),
            );
            return Ok(None);
        }

        let Some(arguments) = self.resolver.resolve(&call.arguments).await?.into_arguments() else {
            self.log(
                LogLevel::Error,
                format!("Failed to parse arguments: {}", call.arguments),
            );
            return Ok(None);
        };
        self.log(
            LogLevel::Debug,
            format!("Calling {} with {}", call.name, serde_json::Value::Object(arguments.clone())),
        );

        match tool.call(arguments).await {
            Ok(output) => Ok(Some(output)),
            Err(e) => {
                self.log(LogLevel::Error, format!("Tool {} failed: {e}", call.name));
                Ok(None)
            }
        }
    }

    /// Schemas of the tools usable on this OS
    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .filter_map(|tool| match tool.schema() {
                Ok(schema) => Some(ToolDefinition::new(
                    schema.function.name.clone(),
                    schema.function.description.clone(),
                    schema.parameters_value(),
                )),
                Err(e) => {
                    self.log(LogLevel::Warning, format!("Leaving out {}: {e}", tool.name()));
                    None
                }
            })
            .collect()
    }

    fn log(&self, level: LogLevel, message: impl fmt::Display) {
        match &self.logger {
            Some(logger) => logger.log(level, message),
            None => emit(level, "executor", &message),
        }
    }
}

/// Builder for AgentExecutor
#[derive(Default)]
pub struct AgentExecutorBuilder {
    provider: Option<Arc<dyn LLMProvider>>,
    resolver: Option<Arc<JsonFixer>>,
    tools: Vec<Arc<dyn Tool>>,
    config: ExecutorConfig,
    logger: Option<ToolLogger>,
}

impl AgentExecutorBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the LLM provider
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the shared argument resolver
    pub fn resolver(mut self, resolver: Arc<JsonFixer>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Add a tool
    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Add several tools
    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Set the full configuration
    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the system prompt
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    /// Set max tokens
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = Some(max_tokens);
        self
    }

    /// Set temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Set the log sink
    pub fn logger(mut self, logger: ToolLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Build the executor
    pub fn build(self) -> Result<AgentExecutor> {
        let provider = self
            .provider
            .ok_or_else(|| Error::InitializationFailed("Provider not set".to_string()))?;
        let resolver = self
            .resolver
            .ok_or_else(|| Error::InitializationFailed("Argument resolver not set".to_string()))?;

        Ok(AgentExecutor {
            provider,
            resolver,
            tools: self.tools,
            config: self.config,
            logger: self.logger,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Map, Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use steward_llm::{CompletionResponse, LLMError, Role, StopReason, TokenUsage};
    use steward_tools::{ToolBase, ToolResult, ToolSpec};
    use steward_utils::Config;
    use tempfile::TempDir;

    /// Replays canned assistant messages and records requests
    pub(crate) struct ScriptedProvider {
        replies: Mutex<VecDeque<Message>>,
        pub(crate) requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        pub(crate) fn new(replies: Vec<Message>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn text(replies: &[&str]) -> Arc<Self> {
            Self::new(replies.iter().map(|r| Message::assistant(*r)).collect())
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> steward_llm::Result<CompletionResponse> {
            self.requests.lock().unwrap().push(request);
            let message = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Message::assistant("not json"));
            Ok(CompletionResponse {
                message,
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct Unreachable;

    #[async_trait]
    impl LLMProvider for Unreachable {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> steward_llm::Result<CompletionResponse> {
            Err(LLMError::RequestFailed("connection refused".to_string()))
        }

        fn name(&self) -> &str {
            "unreachable"
        }
    }

    /// Records the arguments it is called with
    struct Recorder {
        base: ToolBase,
        calls: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl Tool for Recorder {
        fn base(&self) -> &ToolBase {
            &self.base
        }

        async fn call(&self, arguments: Map<String, Value>) -> Result<ToolOutput> {
            let rendered = Value::Object(arguments).to_string();
            self.calls
                .lock()
                .unwrap()
                .push(format!("{} {rendered}", self.name()));
            if self.fail {
                return Err(Error::ProcessingFailed("device offline".to_string()));
            }
            Ok(ToolResult::success(format!("{} done", self.name())).into())
        }
    }

    struct Fixture {
        _dir: TempDir,
        config: Config,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let config =
                Config::from_value(json!({"log": {"dir": dir.path().to_string_lossy()}})).unwrap();
            Self {
                _dir: dir,
                config,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn tool(&self, spec: ToolSpec, fail: bool) -> Arc<dyn Tool> {
            Arc::new(Recorder {
                base: ToolBase::new(spec, &self.config).unwrap(),
                calls: self.calls.clone(),
                fail,
            })
        }

        fn recorder(&self, name: &str) -> Arc<dyn Tool> {
            self.tool(ToolSpec::new(name, format!("{name} tool")), false)
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn executor(
        provider: Arc<ScriptedProvider>,
        resolver: Arc<ScriptedProvider>,
        tools: Vec<Arc<dyn Tool>>,
    ) -> AgentExecutor {
        AgentExecutor::builder()
            .provider(provider)
            .resolver(Arc::new(JsonFixer::new(resolver, "fixer-model")))
            .tools(tools)
            .model("test-model")
            .system_prompt("You are a butler.")
            .build()
            .unwrap()
    }

    fn calls_message(text: Option<&str>, calls: &[(&str, &str)]) -> Message {
        Message::assistant_with_calls(
            text.map(str::to_string),
            calls
                .iter()
                .enumerate()
                .map(|(i, (name, args))| FunctionCall::new(format!("call_{i}"), *name, *args))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_text_reply_returned_verbatim() {
        let fx = Fixture::new();
        let provider = ScriptedProvider::text(&["It is 21 degrees."]);
        let executor = executor(
            provider.clone(),
            ScriptedProvider::text(&[]),
            vec![fx.recorder("lamp")],
        );

        let outcome = executor.run_detailed("Temperature?".to_string()).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Reply("It is 21 degrees.".to_string()));

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.model, "test-model");
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].text(), Some("You are a butler."));
        assert_eq!(request.messages[1].role, Role::User);
        assert_eq!(request.messages[1].text(), Some("Temperature?"));
        let tools = request.tools.as_ref().unwrap();
        assert_eq!(tools[0].name, "lamp");
        assert_eq!(tools[0].parameters["type"], "object");
    }

    #[tokio::test]
    async fn test_calls_dispatched_in_order() {
        let fx = Fixture::new();
        let provider = ScriptedProvider::new(vec![calls_message(
            None,
            &[("lamp", r#"{"on": true}"#), ("fan", r#"{"speed": 2,}"#)],
        )]);
        let resolver = ScriptedProvider::text(&[]);
        let executor = executor(
            provider,
            resolver.clone(),
            vec![fx.recorder("lamp"), fx.recorder("fan")],
        );

        let text = executor.run("Lamp on, fan to 2".to_string()).await.unwrap();

        assert_eq!(
            fx.calls(),
            vec![r#"lamp {"on":true}"#.to_string(), r#"fan {"speed":2}"#.to_string()]
        );
        let lines: Vec<Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(
            lines,
            vec![
                json!({"status": "success", "content": "lamp done"}),
                json!({"status": "success", "content": "fan done"}),
            ]
        );
        // both argument strings were fixed without the model
        assert!(resolver.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_text_with_calls_is_no_operation() {
        let fx = Fixture::new();
        let provider = ScriptedProvider::new(vec![calls_message(
            Some("Turning on the lamp"),
            &[("lamp", "{}")],
        )]);
        let executor = executor(
            provider,
            ScriptedProvider::text(&[]),
            vec![fx.recorder("lamp")],
        );

        assert_eq!(executor.run("Lamp on".to_string()).await.unwrap(), NO_OPERATION);
        assert!(fx.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_reply_is_no_operation() {
        let provider = ScriptedProvider::new(vec![Message {
            role: Role::Assistant,
            content: None,
        }]);
        let executor = executor(provider.clone(), ScriptedProvider::text(&[]), vec![]);

        let outcome = executor.run_detailed("Hello".to_string()).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::NoOperation);
        // no tools, no tool list in the request
        assert!(provider.requests.lock().unwrap()[0].tools.is_none());
    }

    #[tokio::test]
    async fn test_unknown_tool_does_not_abort() {
        let fx = Fixture::new();
        let provider = ScriptedProvider::new(vec![calls_message(
            None,
            &[("vacuum", "{}"), ("lamp", "{}")],
        )]);
        let executor = executor(
            provider,
            ScriptedProvider::text(&[]),
            vec![fx.recorder("lamp")],
        );

        let outcome = executor.run_detailed("Clean up".to_string()).await.unwrap();
        let DispatchOutcome::ToolOutputs(outputs) = outcome else {
            panic!("expected tool outputs");
        };
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].as_result().unwrap().content, "lamp done");
        assert_eq!(fx.calls(), vec!["lamp {}".to_string()]);
    }

    #[tokio::test]
    async fn test_unresolved_arguments_skipped() {
        let fx = Fixture::new();
        let provider = ScriptedProvider::new(vec![calls_message(
            None,
            &[("lamp", "turn it on please"), ("fan", "{}")],
        )]);
        let resolver = ScriptedProvider::text(&[]);
        let executor = executor(
            provider,
            resolver.clone(),
            vec![fx.recorder("lamp"), fx.recorder("fan")],
        );

        let text = executor.run("Lamp and fan".to_string()).await.unwrap();
        assert_eq!(fx.calls(), vec!["fan {}".to_string()]);
        assert!(text.contains("fan done"));
        assert_eq!(resolver.requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_llm_repaired_arguments_used() {
        let fx = Fixture::new();
        let provider = ScriptedProvider::new(vec![calls_message(None, &[("lamp", "on = yes")])]);
        let resolver = ScriptedProvider::text(&["```json\n{\"on\": true}\n```"]);
        let executor = executor(provider, resolver, vec![fx.recorder("lamp")]);

        executor.run("Lamp".to_string()).await.unwrap();
        assert_eq!(fx.calls(), vec![r#"lamp {"on":true}"#.to_string()]);
    }

    #[tokio::test]
    async fn test_failing_tool_skipped() {
        let fx = Fixture::new();
        let provider = ScriptedProvider::new(vec![calls_message(
            None,
            &[("broken", "{}"), ("lamp", "{}")],
        )]);
        let broken = fx.tool(ToolSpec::new("broken", "Always fails"), true);
        let executor = executor(
            provider,
            ScriptedProvider::text(&[]),
            vec![broken, fx.recorder("lamp")],
        );

        let outcome = executor.run_detailed("Do both".to_string()).await.unwrap();
        assert!(matches!(outcome, DispatchOutcome::ToolOutputs(ref outputs) if outputs.len() == 1));
        assert_eq!(fx.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_all_calls_skipped_is_no_operation() {
        let provider = ScriptedProvider::new(vec![calls_message(None, &[("vacuum", "{}")])]);
        let executor = executor(provider, ScriptedProvider::text(&[]), vec![]);

        assert_eq!(executor.run("Clean".to_string()).await.unwrap(), NO_OPERATION);
    }

    #[tokio::test]
    async fn test_unsupported_tool_left_out() {
        let fx = Fixture::new();
        let others: Vec<Os> = Os::ALL.into_iter().filter(|os| *os != Os::current()).collect();
        let foreign = fx.tool(
            ToolSpec::new("foreign", "Other OS only").with_support_os(others),
            false,
        );
        let provider = ScriptedProvider::text(&["ok"]);
        let executor = executor(
            provider.clone(),
            ScriptedProvider::text(&[]),
            vec![foreign, fx.recorder("lamp")],
        );

        executor.run("hi".to_string()).await.unwrap();
        let requests = provider.requests.lock().unwrap();
        let names: Vec<&str> = requests[0]
            .tools
            .as_ref()
            .unwrap()
            .iter()
            .map(|tool| tool.name.as_str())
            .collect();
        assert_eq!(names, vec!["lamp"]);
    }

    #[tokio::test]
    async fn test_unsupported_tool_never_invoked() {
        let fx = Fixture::new();
        let others: Vec<Os> = Os::ALL.into_iter().filter(|os| *os != Os::current()).collect();
        let foreign = fx.tool(
            ToolSpec::new("foreign", "Other OS only").with_support_os(others),
            false,
        );
        let provider = ScriptedProvider::new(vec![calls_message(
            None,
            &[("foreign", "{}"), ("lamp", "{}")],
        )]);
        let executor = executor(
            provider,
            ScriptedProvider::text(&[]),
            vec![foreign, fx.recorder("lamp")],
        );

        let outcome = executor.run_detailed("Do both".to_string()).await.unwrap();
        assert!(matches!(outcome, DispatchOutcome::ToolOutputs(ref outputs) if outputs.len() == 1));
        assert_eq!(fx.calls(), vec!["lamp {}".to_string()]);
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let executor = AgentExecutor::new(
            Arc::new(Unreachable),
            Arc::new(JsonFixer::new(Arc::new(Unreachable), "fixer-model")),
            vec![],
            ExecutorConfig::default(),
        );

        let result = executor.run("hi".to_string()).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[test]
    fn test_builder_requires_provider_and_resolver() {
        let result = AgentExecutor::builder().build();
        assert!(matches!(result, Err(Error::InitializationFailed(_))));

        let result = AgentExecutor::builder()
            .provider(ScriptedProvider::text(&[]))
            .build();
        assert!(matches!(result, Err(Error::InitializationFailed(_))));
    }

    #[test]
    fn test_default_config() {
        let config = ExecutorConfig::default();
        assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert!(config.max_tokens.is_none());
    }

    #[test]
    fn test_outcome_text() {
        assert_eq!(DispatchOutcome::NoOperation.to_string(), NO_OPERATION);
        let outcome = DispatchOutcome::ToolOutputs(vec![
            ToolOutput::from("a"),
            ToolOutput::from("b"),
        ]);
        assert_eq!(outcome.into_text(), "a\nb");
    }
}
