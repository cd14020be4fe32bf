//! Layout planning.
//!
//! A [`LayoutPolicy`] turns a [`Snapshot`] into a [`LayoutTarget`]. Planning
//! is pure: no I/O, same input gives the same output, and bad settings
//! surface as [`PlanError::PolicyMisconfigured`] instead of a panic.

mod grid;
mod target;

pub use grid::{grid_dims, GridSpatialPolicy};
pub use target::{GridDims, LayoutTarget, TargetEntry};

use spatial_common::errors::PlanError;
use spatial_config::schema::{LayoutConfig, GRID_SPATIAL_POLICY};

use crate::snapshot::Snapshot;

/// A rule mapping the current windows to where they should be.
pub trait LayoutPolicy: Send + Sync {
    /// Name used in `layout.policy`.
    fn name(&self) -> &str;

    /// Compute the target for `snapshot`. `previous` is the last target,
    /// which policies may use to keep the layout stable.
    fn plan(
        &self,
        snapshot: &Snapshot,
        previous: Option<&LayoutTarget>,
    ) -> Result<LayoutTarget, PlanError>;
}

/// Wraps the configured policy.
pub struct LayoutPlanner {
    policy: Box<dyn LayoutPolicy>,
}

impl LayoutPlanner {
    pub fn new(policy: Box<dyn LayoutPolicy>) -> Self {
        Self { policy }
    }

    /// Select the policy named by `config.policy`.
    pub fn from_config(config: &LayoutConfig) -> Result<Self, PlanError> {
        match config.policy.as_str() {
            GRID_SPATIAL_POLICY => Ok(Self::new(Box::new(GridSpatialPolicy::from_config(config)))),
            other => Err(PlanError::PolicyMisconfigured(format!(
                "unknown layout policy '{other}'"
            ))),
        }
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    pub fn plan(
        &self,
        snapshot: &Snapshot,
        previous: Option<&LayoutTarget>,
    ) -> Result<LayoutTarget, PlanError> {
        let target = self.policy.plan(snapshot, previous)?;
        debug_assert!(target.ids().all(|id| snapshot.contains(id)));
        tracing::debug!(
            policy = self.policy.name(),
            windows = snapshot.len(),
            targets = target.len(),
            "layout planned"
        );
        Ok(target)
    }
}
