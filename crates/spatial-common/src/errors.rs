use std::path::PathBuf;
use std::time::Duration;

use crate::types::WindowId;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),

    #[error("config watch error: {0}")]
    WatchError(String),
}

/// Failure of a single call across the automation boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// The remote application is not running or not scriptable.
    #[error("application unreachable: {0}")]
    Unreachable(String),

    /// Automation consent has not been granted to this process.
    #[error("automation permission denied: {0}")]
    PermissionDenied(String),

    /// The call exceeded its time budget.
    #[error("bridge call timed out after {0:?}")]
    Timeout(Duration),

    /// The target window closed before the call reached it.
    #[error("window {0} is gone")]
    WindowGone(WindowId),

    #[error("not supported: {0}")]
    NotSupported(String),
}

impl BridgeError {
    /// Short machine-friendly label, used in logs and cycle reports.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::Unreachable(_) => "unreachable",
            BridgeError::PermissionDenied(_) => "permission_denied",
            BridgeError::Timeout(_) => "timeout",
            BridgeError::WindowGone(_) => "window_gone",
            BridgeError::NotSupported(_) => "not_supported",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("layout policy misconfigured: {0}")]
    PolicyMisconfigured(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
