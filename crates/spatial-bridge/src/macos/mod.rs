//! macOS AppleScript bridge.
//!
//! Every call spawns one `osascript` process. Script text and output
//! parsing live in [`crate::script`]; this module only runs them and maps
//! failures. Calls block until the script returns, so callers bound them
//! with their own timeouts.

mod types;
mod window_management;

pub use types::*;
