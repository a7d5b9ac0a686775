//! Error types for steward-core

use steward_utils::ConfigError;
use thiserror::Error;

/// Result type alias for steward-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for agent and tool operations
#[derive(Error, Debug)]
pub enum Error {
    /// Generic error message
    #[error("{0}")]
    Generic(String),

    /// Agent initialization failed
    #[error("Agent initialization failed: {0}")]
    InitializationFailed(String),

    /// Agent processing failed
    #[error("Agent processing failed: {0}")]
    ProcessingFailed(String),

    /// Configuration lookup or loading failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A required config-binding rule could not be satisfied
    #[error("Tool {tool} requires configuration key '{key}'")]
    MissingConfig {
        /// Tool being constructed
        tool: String,
        /// Configuration path that resolved to nothing
        key: String,
    },

    /// A tool was used before its construction completed
    #[error("Tool {0} has not been initialized")]
    Uninitialized(String),

    /// The running OS is not in the tool's supported set
    #[error("Tool {tool} does not support {os}; supported: {supported}")]
    UnsupportedOs {
        /// Tool name
        tool: String,
        /// Current OS tag
        os: String,
        /// Comma-separated supported OS tags
        supported: String,
    },

    /// The tool does not implement invocation
    #[error("Tool {0} is not implemented")]
    NotImplemented(String),

    /// No tool is registered under this name
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// No tool is registered under this qualified path
    #[error("Unknown tool path: {0}")]
    UnknownToolPath(String),

    /// Tool arguments did not match the declared parameters
    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments {
        /// Tool name
        tool: String,
        /// What was wrong
        reason: String,
    },

    /// The LLM endpoint could not be reached or rejected the request
    #[error("LLM request failed: {0}")]
    Transport(String),
}
