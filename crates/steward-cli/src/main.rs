//! Command-line interface for steward-rs
//!
//! Loads a JSON configuration, builds a tool agent from the tools listed in
//! `tool_names` and runs a single query.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use steward_core::Agent;
use steward_runtime::ToolAgent;
use steward_tools::{ToolRegistry, register_builtin_tools};
use steward_utils::{Config, LogSettings};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "steward")]
#[command(about = "Run a tool-calling agent from a JSON configuration", long_about = None)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Agent name, also used for its log file
    #[arg(short, long, default_value = "steward")]
    name: String,

    /// List the registered tools and exit
    #[arg(long)]
    list_tools: bool,

    /// Print the function-calling schemas of the enabled tools and exit
    #[arg(long)]
    schema: bool,

    /// Query to send to the agent
    query: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let registry = ToolRegistry::new();
    register_builtin_tools(&registry);

    if args.list_tools {
        steward_utils::init_tracing();
        for name in registry.names() {
            if let Some(entry) = registry.get(&name) {
                println!("{name}\t{}", entry.spec().description);
            }
        }
        return Ok(());
    }

    let config = Config::from_json_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    steward_utils::init_tracing_at(LogSettings::from_config(&config).level);
    info!(config = %args.config.display(), "Configuration loaded");

    let agent = ToolAgent::builder(args.name)
        .build(&config, &registry)
        .context("Failed to build agent")?;

    if args.schema {
        let schemas = agent
            .executor()
            .tools()
            .iter()
            .map(|tool| tool.schema().map(|schema| schema.to_value()))
            .collect::<Result<Vec<_>, _>>()?;
        println!("{}", serde_json::to_string_pretty(&schemas)?);
        return Ok(());
    }

    let Some(query) = args.query else {
        anyhow::bail!("No query given; pass one as an argument or use --list-tools / --schema");
    };

    let answer = agent.process(query).await?;
    println!("{answer}");

    Ok(())
}
