//! Layout policy and write-application configuration types.

use serde::{Deserialize, Serialize};

/// Name of the reference near-square grid policy.
pub const GRID_SPATIAL_POLICY: &str = "grid-spatial";

/// Every policy name accepted by `layout.policy`.
pub const KNOWN_POLICIES: &[&str] = &[GRID_SPATIAL_POLICY];

/// Window arrangement configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Layout policy name (see [`KNOWN_POLICIES`]).
    pub policy: String,
    /// Screen-edge margin in points (valid range: 0-200).
    pub edge_margin: u32,
    /// Gap between neighbouring windows in points (valid range: 0-100).
    pub gutter: u32,
    /// Bring managed windows to the front in arrangement order.
    pub raise_on_arrange: bool,
    /// Also arrange floating windows (palettes, inspectors).
    pub manage_floating: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            policy: GRID_SPATIAL_POLICY.into(),
            edge_margin: 0,
            gutter: 0,
            raise_on_arrange: false,
            manage_floating: false,
        }
    }
}

/// How planned writes are pushed through the automation boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyConfig {
    /// Concurrent window writes per cycle (valid range: 1-16).
    pub max_concurrent_writes: u32,
    /// Concurrent window reads per collection (valid range: 1-16).
    pub max_concurrent_reads: u32,
    /// Geometry difference in points treated as converged (valid range: 0.0-50.0).
    pub epsilon: f64,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_writes: 4,
            max_concurrent_reads: 4,
            epsilon: 2.0,
        }
    }
}
