//! macOS bridge types and constructors.

/// Scripting bridge that drives one application through `osascript`.
pub struct AppleScriptBridge {
    /// Application name used in `tell application` blocks.
    pub(super) application: String,
}

impl AppleScriptBridge {
    pub fn new(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
        }
    }

    pub fn application(&self) -> &str {
        &self.application
    }
}

impl Default for AppleScriptBridge {
    fn default() -> Self {
        Self::new("Safari")
    }
}
