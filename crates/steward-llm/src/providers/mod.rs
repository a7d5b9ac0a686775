//! Concrete LLM provider implementations
//!
//! Only OpenAI-compatible endpoints are supported. Local servers such as
//! LM Studio or vLLM speak the same protocol and work through
//! [`OpenAIConfig::with_api_base`].

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "openai")]
pub use openai::{DEFAULT_OPENAI_API_BASE, OpenAIConfig, OpenAIProvider};
