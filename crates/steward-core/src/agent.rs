//! Core Agent trait definition

use crate::Result;
use async_trait::async_trait;

/// Core trait that all agents must implement
///
/// An agent takes one user query and produces one textual answer. Concrete
/// agents decide how much LLM and tool work happens in between.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Process a query and return the answer
    async fn process(&self, input: String) -> Result<String>;

    /// Get the agent's name
    fn name(&self) -> &str;

    /// Initialize the agent (optional)
    async fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    /// Shutdown the agent (optional)
    async fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}
