//! System configuration types: target application and logging.

use serde::{Deserialize, Serialize};

/// The scriptable application whose windows are arranged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Application name as known to the scripting bridge.
    pub application: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            application: "Safari".into(),
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
#[derive(Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// `tracing` filter directive covering every workspace crate.
    pub fn directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "spatial=trace",
            LogLevel::Debug => "spatial=debug",
            LogLevel::Info => "spatial=info",
            LogLevel::Warning => "spatial=warn",
            LogLevel::Error => "spatial=error",
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}
