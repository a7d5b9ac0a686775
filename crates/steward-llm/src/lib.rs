//! LLM layer for steward-rs
//!
//! This crate provides provider-agnostic abstractions for talking to chat
//! models, plus the machinery that turns a model's function-call argument
//! strings into usable JSON objects. It includes:
//!
//! - Message types for LLM communication
//! - Completion request/response types
//! - Tool definitions and function calls
//! - Provider trait and the OpenAI-compatible implementation (feature `openai`)
//! - Deterministic JSON repair ([`repair`]) and the escalating
//!   argument resolver ([`JsonFixer`])

pub mod completion;
pub mod error;
pub mod json_fixer;
pub mod messages;
pub mod provider;
pub mod repair;
pub mod tools;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use json_fixer::{ArgumentResolution, JsonFixer, RepairStrategy};
pub use messages::{ContentBlock, Message, MessageContent, Role};
pub use provider::LLMProvider;
pub use repair::repair_json;
pub use tools::{FunctionCall, ToolDefinition};

// Provider implementations (feature-gated)
#[cfg(feature = "openai")]
pub mod providers;
