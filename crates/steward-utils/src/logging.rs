//! Logging and tracing utilities
//!
//! Process-wide diagnostics go through `tracing`. In addition, every tool
//! instance owns a [`ToolLogger`] that appends human-readable lines to its
//! own file and echoes them through `tracing` when they are severe enough.

use crate::Config;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default directory for per-tool log files
pub const DEFAULT_LOG_DIR: &str = ".local/tool_logs";

/// Initialize tracing subscriber with default configuration
pub fn init_tracing() {
    init_tracing_at(LogLevel::default());
}

/// Initialize tracing subscriber, filtering at `level` unless `RUST_LOG` is set
pub fn init_tracing_at(level: LogLevel) {
    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()))
}

/// Severity of a tool log line, ordered `Debug < Info < Warning < Error`
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose diagnostics
    Debug,
    /// Normal operation
    #[default]
    Info,
    /// Something unexpected but recoverable
    Warning,
    /// A failed operation
    Error,
}

impl LogLevel {
    /// Lowercase name used in log lines and configuration
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Filter directive for `tracing_subscriber::EnvFilter`
    pub fn directive(self) -> &'static str {
        match self {
            Self::Warning => "warn",
            level => level.as_str(),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a log level name is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown log level: {0}")]
pub struct ParseLogLevelError(String);

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            _ => Err(ParseLogLevelError(s.to_string())),
        }
    }
}

/// Where tool logs go and which lines are echoed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Directory holding the per-tool log files
    pub dir: PathBuf,
    /// Minimum level echoed through `tracing`
    pub level: LogLevel,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_LOG_DIR),
            level: LogLevel::default(),
        }
    }
}

impl LogSettings {
    /// Read `log.dir` and `log.level` from a configuration
    ///
    /// Missing keys keep their defaults; an unknown level name is reported
    /// and ignored.
    pub fn from_config(config: &Config) -> Self {
        let mut settings = Self::default();
        if let Some(dir) = config.get_str("log.dir") {
            settings.dir = PathBuf::from(dir);
        }
        if let Some(level) = config.get_str("log.level") {
            match level.parse() {
                Ok(level) => settings.level = level,
                Err(e) => tracing::warn!(error = %e, "Ignoring log.level"),
            }
        }
        settings
    }
}

/// Per-instance log sink for a tool or agent
///
/// Lines look like `[list_all_tools] info message` and are appended to
/// `<dir>/<name>-<YYYY-mm-dd-HH-MM-SS>.log`. The directory is created on
/// first write.
#[derive(Debug, Clone)]
pub struct ToolLogger {
    name: String,
    path: PathBuf,
    echo_level: LogLevel,
}

impl ToolLogger {
    /// Create a logger for `name`, stamped with the current local time
    pub fn new(name: impl Into<String>, settings: &LogSettings) -> Self {
        let name = name.into();
        let started = Local::now().format("%Y-%m-%d-%H-%M-%S");
        let path = settings.dir.join(format!("{name}-{started}.log"));
        Self {
            name,
            path,
            echo_level: settings.level,
        }
    }

    /// Append `-<suffix>` to the log file name, before the extension
    pub fn with_suffix(mut self, suffix: &str) -> Self {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path.set_file_name(format!("{stem}-{suffix}.log"));
        self
    }

    /// Name printed in front of each line
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Minimum level echoed through `tracing`
    pub fn echo_level(&self) -> LogLevel {
        self.echo_level
    }

    /// Write one line at `level`
    ///
    /// File errors are reported through `tracing` and otherwise ignored.
    pub fn log(&self, level: LogLevel, message: impl fmt::Display) {
        if level >= self.echo_level {
            emit(level, &self.name, &message);
        }

        let line = format!("[{}] {} {}", self.name, level, message);
        if let Err(e) = self.append(&line) {
            tracing::warn!(
                source = %self.name,
                path = %self.path.display(),
                error = %e,
                "Failed to write tool log"
            );
        }
    }

    /// Write a debug line
    pub fn debug(&self, message: impl fmt::Display) {
        self.log(LogLevel::Debug, message);
    }

    /// Write an info line
    pub fn info(&self, message: impl fmt::Display) {
        self.log(LogLevel::Info, message);
    }

    /// Write a warning line
    pub fn warning(&self, message: impl fmt::Display) {
        self.log(LogLevel::Warning, message);
    }

    /// Write an error line
    pub fn error(&self, message: impl fmt::Display) {
        self.log(LogLevel::Error, message);
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }
}

/// Emit a message through `tracing` at the matching level
pub fn emit(level: LogLevel, source: &str, message: &dyn fmt::Display) {
    match level {
        LogLevel::Debug => tracing::debug!(source = %source, "{message}"),
        LogLevel::Info => tracing::info!(source = %source, "{message}"),
        LogLevel::Warning => tracing::warn!(source = %source, "{message}"),
        LogLevel::Error => tracing::error!(source = %source, "{message}"),
    }
}
