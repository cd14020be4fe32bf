//! Per-cycle summary handed to the observer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use spatial_common::types::WindowId;
use spatial_common::CycleId;

use crate::reconciler::ReconcileOutcome;

/// What one cycle did. A cycle that could not collect or plan carries an
/// `error` and applies nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub cycle_id: CycleId,
    pub started_at: DateTime<Utc>,
    pub applied_count: usize,
    pub failed_ids: Vec<WindowId>,
    pub skipped_ids: Vec<WindowId>,
    pub deferred_ids: Vec<WindowId>,
    pub dropped_ids: Vec<WindowId>,
    pub duration_ms: u64,
    /// Windows in the snapshot; zero when collection failed.
    pub window_count: usize,
    pub error: Option<String>,
}

impl CycleReport {
    pub(crate) fn new(cycle_id: CycleId, started_at: DateTime<Utc>) -> Self {
        Self {
            cycle_id,
            started_at,
            applied_count: 0,
            failed_ids: Vec::new(),
            skipped_ids: Vec::new(),
            deferred_ids: Vec::new(),
            dropped_ids: Vec::new(),
            duration_ms: 0,
            window_count: 0,
            error: None,
        }
    }

    pub(crate) fn absorb(&mut self, outcome: ReconcileOutcome) {
        self.applied_count = outcome.applied_count;
        self.failed_ids = outcome.failed_ids;
        self.skipped_ids = outcome.skipped_ids;
        self.deferred_ids = outcome.deferred_ids;
        self.dropped_ids = outcome.dropped_ids;
    }

    /// True when the cycle stopped before applying anything.
    pub fn is_skipped(&self) -> bool {
        self.error.is_some()
    }
}
