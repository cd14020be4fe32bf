//! Collect, plan and reconcile loop that keeps a remote application's
//! windows arranged.
//!
//! One cycle reads a [`Snapshot`](snapshot::Snapshot) through the
//! [`Collector`](collector::Collector), computes a
//! [`LayoutTarget`](planner::LayoutTarget) with the
//! [`LayoutPlanner`](planner::LayoutPlanner) and drives the remote side
//! toward it with the [`Reconciler`](reconciler::Reconciler). The
//! [`Scheduler`](scheduler::Scheduler) decides when cycles run.

mod blocking;

pub mod collector;
pub mod config;
pub mod planner;
pub mod reconciler;
pub mod scheduler;
pub mod snapshot;

pub use collector::Collector;
pub use config::{EngineConfig, RetryPolicy};
pub use planner::{LayoutPlanner, LayoutPolicy, LayoutTarget};
pub use reconciler::{ReconcileOutcome, ReconciliationState, Reconciler};
pub use scheduler::{CycleReport, CycleRunner, Phase, Scheduler, SchedulerHandle};
pub use snapshot::{Snapshot, WindowHandle};
