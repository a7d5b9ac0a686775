//! Shared utilities for steward-rs
//!
//! This crate provides the dotted-path configuration tree used by every
//! other crate in the workspace, plus logging setup and the per-tool log
//! sink.

pub mod config;
pub mod logging;

pub use config::{Config, ConfigError};
pub use logging::{LogLevel, LogSettings, ToolLogger, init_tracing, init_tracing_at};
