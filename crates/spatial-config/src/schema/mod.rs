//! Configuration schema types for Spatial Safari.
//!
//! All structs use `serde(default)` so partial configs work correctly.
//! Missing fields are filled with the defaults documented on each field.

mod layout;
mod scheduler;
mod system;

pub use layout::*;
pub use scheduler::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
///
/// All options have sensible defaults; only override what you want to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct SpatialConfig {
    pub target: TargetConfig,
    pub scheduler: SchedulerConfig,
    pub retry: RetryConfig,
    pub apply: ApplyConfig,
    pub layout: LayoutConfig,
    pub logging: LoggingConfig,
}

// =============================================================================
// Tests
// =============================================================================
