//! Operating-system tags used to gate tools

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating system a tool can run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// Microsoft Windows
    Windows,
    /// Linux and other Unix-likes
    Linux,
    /// Apple macOS
    MacOs,
}

impl Os {
    /// Every known OS, the default support set of a tool
    pub const ALL: [Os; 3] = [Os::Windows, Os::Linux, Os::MacOs];

    /// OS this binary was compiled for
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Os::Windows
        } else if cfg!(target_os = "macos") {
            Os::MacOs
        } else {
            Os::Linux
        }
    }

    /// Lowercase tag (`"windows"`, `"linux"`, `"macos"`)
    pub fn as_str(self) -> &'static str {
        match self {
            Os::Windows => "windows",
            Os::Linux => "linux",
            Os::MacOs => "macos",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Os {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "windows" | "nt" => Ok(Os::Windows),
            "linux" | "posix" => Ok(Os::Linux),
            "macos" | "mac" | "darwin" => Ok(Os::MacOs),
            other => Err(format!("unknown OS tag: {other}")),
        }
    }
}
