//! Argument resolution with escalating JSON repair
//!
//! Function-call arguments come back from the model as a string. Most of the
//! time it is valid JSON; sometimes it is truncated or sloppy. [`JsonFixer`]
//! turns it into a JSON object, trying in order:
//!
//! 1. a strict `serde_json` parse,
//! 2. the deterministic [`repair_json`] pass,
//! 3. asking the model to fix it, up to `retry_times` identical attempts.
//!
//! Only the last step touches the network. If every attempt fails the
//! outcome is [`ArgumentResolution::Unresolved`], not an error.

use crate::repair::repair_json;
use crate::{CompletionRequest, LLMProvider, Message, Result};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Default number of LLM repair attempts
pub const DEFAULT_RETRY_TIMES: usize = 3;

/// System prompt for repair requests
pub const SYSTEM_PROMPT: &str = "You are a JSON repair expert.";

/// Default instruction placed before the broken JSON
pub const DEFAULT_INSTRUCTIONS: &str = "Fix the formatting errors in the following JSON string so that it is valid JSON. Return only the fixed JSON string and nothing else.";

/// Config paths for the API key, most specific first
pub const API_KEY_SOURCES: &[&str] = &["json_fixer.openai_key", "openai_api_key"];

/// Config paths for the API base URL, most specific first
pub const API_BASE_SOURCES: &[&str] = &["json_fixer.openai_base", "openai_api_base"];

/// Config paths for the repair model, most specific first
pub const MODEL_SOURCES: &[&str] = &["json_fixer.model", "model"];

/// Which step produced the arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStrategy {
    /// The raw string was valid JSON
    Strict,
    /// The deterministic repair pass fixed it
    Syntactic,
    /// The model fixed it on the given attempt (1-based)
    Llm {
        /// Attempt that succeeded
        attempt: usize,
    },
}

/// Outcome of resolving a raw argument string
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentResolution {
    /// Arguments were recovered
    Resolved {
        /// Parsed argument object
        arguments: Map<String, Value>,
        /// Step that produced it
        strategy: RepairStrategy,
    },
    /// Every strategy failed
    Unresolved,
}

impl ArgumentResolution {
    /// Whether arguments were recovered
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    /// Step that produced the arguments, if any
    pub fn strategy(&self) -> Option<RepairStrategy> {
        match self {
            Self::Resolved { strategy, .. } => Some(*strategy),
            Self::Unresolved => None,
        }
    }

    /// Take the argument object, if any
    pub fn into_arguments(self) -> Option<Map<String, Value>> {
        match self {
            Self::Resolved { arguments, .. } => Some(arguments),
            Self::Unresolved => None,
        }
    }
}

/// Resolver for malformed function-call arguments
///
/// Build one per process and share it (`Arc<JsonFixer>`); it holds the
/// provider client configured with the repair credentials.
pub struct JsonFixer {
    provider: Arc<dyn LLMProvider>,
    model: String,
    retry_times: usize,
}

impl JsonFixer {
    /// Create a fixer that repairs through `provider` using `model`
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            retry_times: DEFAULT_RETRY_TIMES,
        }
    }

    /// Set the number of LLM repair attempts
    pub fn with_retry_times(mut self, retry_times: usize) -> Self {
        self.retry_times = retry_times;
        self
    }

    /// Build a fixer backed by an OpenAI-compatible endpoint
    ///
    /// Credentials and model are resolved through [`API_KEY_SOURCES`],
    /// [`API_BASE_SOURCES`] and [`MODEL_SOURCES`]; the base URL falls back
    /// to the provider default. `json_fixer.retry_times` overrides
    /// [`DEFAULT_RETRY_TIMES`].
    #[cfg(feature = "openai")]
    pub fn from_config(config: &steward_utils::Config) -> Result<Self> {
        use crate::providers::{OpenAIConfig, OpenAIProvider};

        let api_key = config.get_str_with_fallback(API_KEY_SOURCES)?;
        let model = config.get_str_with_fallback(MODEL_SOURCES)?;
        let retry_times = config
            .get_as::<usize>("json_fixer.retry_times")?
            .unwrap_or(DEFAULT_RETRY_TIMES);

        let mut openai = OpenAIConfig::new(api_key);
        if let Ok(api_base) = config.get_str_with_fallback(API_BASE_SOURCES) {
            openai = openai.with_api_base(api_base);
        }
        let provider = OpenAIProvider::with_config(openai)?;

        Ok(Self::new(Arc::new(provider), model).with_retry_times(retry_times))
    }

    /// Model used for repair requests
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Number of LLM repair attempts
    pub fn retry_times(&self) -> usize {
        self.retry_times
    }

    /// Resolve a raw argument string into a JSON object
    ///
    /// Transport errors from the repair endpoint are returned as `Err`;
    /// unrepairable input is `Ok(ArgumentResolution::Unresolved)`.
    #[instrument(skip(self, raw), fields(raw_len = raw.len()))]
    pub async fn resolve(&self, raw: &str) -> Result<ArgumentResolution> {
        if let Some(arguments) = parse_object(raw) {
            return Ok(ArgumentResolution::Resolved {
                arguments,
                strategy: RepairStrategy::Strict,
            });
        }

        if let Some(arguments) = parse_object(&repair_json(raw)) {
            debug!("Arguments fixed by syntactic repair");
            return Ok(ArgumentResolution::Resolved {
                arguments,
                strategy: RepairStrategy::Syntactic,
            });
        }

        let fixed = self
            .repair_with_llm(raw, DEFAULT_INSTRUCTIONS, |value| value.is_object())
            .await?;
        Ok(match fixed {
            Some((Value::Object(arguments), attempt)) => ArgumentResolution::Resolved {
                arguments,
                strategy: RepairStrategy::Llm { attempt },
            },
            _ => {
                warn!(
                    retry_times = self.retry_times,
                    "Could not resolve function arguments"
                );
                ArgumentResolution::Unresolved
            }
        })
    }

    /// Ask the model to fix `broken_json`
    ///
    /// Uses `format_instructions` in place of the default instruction when
    /// given. Returns `None` if no reply parsed within `retry_times`
    /// attempts.
    pub async fn fix_json(
        &self,
        broken_json: &str,
        format_instructions: Option<&str>,
    ) -> Result<Option<Value>> {
        let instructions = format_instructions.unwrap_or(DEFAULT_INSTRUCTIONS);
        let fixed = self
            .repair_with_llm(broken_json, instructions, |_| true)
            .await?;
        Ok(fixed.map(|(value, _)| value))
    }

    async fn repair_with_llm(
        &self,
        broken_json: &str,
        instructions: &str,
        accept: impl Fn(&Value) -> bool,
    ) -> Result<Option<(Value, usize)>> {
        let prompt = format!("{instructions}\n\n{broken_json}");

        for attempt in 1..=self.retry_times {
            let request = CompletionRequest::builder(&self.model)
                .add_message(Message::system(SYSTEM_PROMPT))
                .add_message(Message::user(prompt.clone()))
                .build();

            let response = self.provider.complete(request).await?;
            let reply = response.message.text().unwrap_or_default();
            let candidate = strip_code_fence(reply);

            match serde_json::from_str::<Value>(candidate) {
                Ok(value) if accept(&value) => {
                    debug!(attempt, "JSON fixed by model");
                    return Ok(Some((value, attempt)));
                }
                Ok(_) => debug!(attempt, reply = %candidate, "Model returned non-object JSON"),
                Err(e) => debug!(attempt, reply = %candidate, error = %e, "Model repair failed"),
            }
        }

        Ok(None)
    }
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Remove a surrounding ```` ``` ```` / ```` ```json ```` fence, if present
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };
    body.strip_prefix("json")
        .or_else(|| body.strip_prefix("JSON"))
        .unwrap_or(body)
        .trim()
}
