//! Resolve malformed function-call arguments against an OpenAI-compatible server
//!
//! Works with LM Studio, llama.cpp, vLLM, Ollama or the OpenAI API itself.
//!
//! # Usage
//!
//! ```bash
//! export OPENAI_API_BASE="http://localhost:1234/v1"
//! export OPENAI_MODEL="your-model-name"
//! cargo run --example repair_arguments -p steward-llm -- '{"entity_id": "light.desk", '
//! ```
//!
//! Without an argument a few built-in samples are resolved.

use std::env;
use std::sync::Arc;
use steward_llm::JsonFixer;
use steward_llm::providers::{OpenAIConfig, OpenAIProvider};

const SAMPLES: &[&str] = &[
    r#"{"entity_id": "light.desk", "brightness": 80}"#,
    r#"{"entity_id": "switch.fan", "service": "turn_on", "data": {}"#,
    "{entity_id: 'light.kitchen', on: True,}",
    "turn on the kitchen light",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    steward_utils::init_tracing();

    let api_base =
        env::var("OPENAI_API_BASE").unwrap_or_else(|_| "http://localhost:1234/v1".to_string());
    let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
    let api_key = env::var("OPENAI_API_KEY").unwrap_or_else(|_| "not-needed".to_string());

    let config = OpenAIConfig::new(api_key)
        .with_api_base(api_base.clone())
        .with_timeout(180);
    let provider = OpenAIProvider::with_config(config)?;
    let fixer = JsonFixer::new(Arc::new(provider), model.clone());

    println!("API Base: {api_base}");
    println!("Model:    {model}\n");

    let inputs: Vec<String> = match env::args().nth(1) {
        Some(raw) => vec![raw],
        None => SAMPLES.iter().map(ToString::to_string).collect(),
    };

    for raw in inputs {
        println!("Input:    {raw}");
        let resolution = fixer.resolve(&raw).await?;
        match (resolution.strategy(), resolution.into_arguments()) {
            (Some(strategy), Some(arguments)) => {
                println!("Strategy: {strategy:?}");
                println!("Result:   {}\n", serde_json::Value::Object(arguments));
            }
            _ => println!("Result:   unresolved after {} attempts\n", fixer.retry_times()),
        }
    }

    Ok(())
}
