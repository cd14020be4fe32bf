//! State the reconciler carries from one cycle to the next.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use spatial_common::types::WindowId;

use crate::blocking::BridgeTask;
use crate::config::RetryPolicy;
use crate::planner::{LayoutTarget, TargetEntry};
use crate::snapshot::Snapshot;

/// Failure history of one window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackoffEntry {
    /// Consecutive failed writes. Reset on the first success.
    pub failures: u32,
    /// No write before this instant.
    pub retry_at: Option<Instant>,
    /// Gave up on this window for the rest of the session.
    pub skipped: bool,
}

impl BackoffEntry {
    /// Count one more failure and decide what happens next.
    pub fn record_failure(&mut self, now: Instant, policy: &RetryPolicy) -> FailureVerdict {
        self.failures = self.failures.saturating_add(1);
        if self.failures >= policy.max_attempts {
            self.skipped = true;
            self.retry_at = None;
            return FailureVerdict::Skipped;
        }
        let retry_at = now + policy.delay(self.failures);
        self.retry_at = Some(retry_at);
        FailureVerdict::RetryAt(retry_at)
    }

    /// Whether a write may be issued at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        !self.skipped && self.retry_at.map_or(true, |at| now >= at)
    }
}

/// A window whose writes all succeeded against one snapshot, and the target
/// they were for. Only valid while that snapshot is the latest.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AppliedWrite {
    pub captured: Instant,
    pub target: TargetEntry,
}

/// Outcome of recording one more failure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailureVerdict {
    /// Try again no sooner than this.
    RetryAt(Instant),
    /// `max_attempts` reached.
    Skipped,
}

/// Owned by the scheduler loop; only the reconciler mutates it.
#[derive(Default)]
pub struct ReconciliationState {
    last_snapshot: Option<Arc<Snapshot>>,
    last_target: Option<LayoutTarget>,
    backoff: HashMap<WindowId, BackoffEntry>,
    /// Writes that outlived their timeout and are still running.
    stranded: HashMap<WindowId, BridgeTask<()>>,
    applied: HashMap<WindowId, AppliedWrite>,
}

impl ReconciliationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.last_snapshot.as_ref()
    }

    pub fn last_target(&self) -> Option<&LayoutTarget> {
        self.last_target.as_ref()
    }

    pub fn backoff(&self, id: WindowId) -> Option<&BackoffEntry> {
        self.backoff.get(&id)
    }

    /// Consecutive failures recorded for `id`.
    pub fn failures(&self, id: WindowId) -> u32 {
        self.backoff.get(&id).map_or(0, |e| e.failures)
    }

    pub fn is_skipped(&self, id: WindowId) -> bool {
        self.backoff.get(&id).is_some_and(|e| e.skipped)
    }

    /// Whether a write to `id` from an earlier call is still running.
    /// Finished stranded writes are forgotten here.
    pub fn is_stranded(&mut self, id: WindowId) -> bool {
        match self.stranded.get(&id) {
            Some(task) if task.is_finished() => {
                self.stranded.remove(&id);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    pub(crate) fn strand(&mut self, id: WindowId, task: BridgeTask<()>) {
        self.stranded.insert(id, task);
    }

    pub(crate) fn set_backoff(&mut self, id: WindowId, entry: BackoffEntry) {
        if entry == BackoffEntry::default() {
            self.backoff.remove(&id);
        } else {
            self.backoff.insert(id, entry);
        }
    }

    pub(crate) fn applied(&self, id: WindowId) -> Option<&AppliedWrite> {
        self.applied.get(&id)
    }

    pub(crate) fn record_applied(&mut self, id: WindowId, write: AppliedWrite) {
        self.applied.insert(id, write);
    }

    /// Forget every window missing from `snapshot` and remember it and
    /// `target` as the latest.
    ///
    /// Skipped windows stay skipped for the session even when a collection
    /// misses them. Applied-write memory from older snapshots is dropped.
    pub(crate) fn finish_cycle(&mut self, snapshot: &Arc<Snapshot>, target: &LayoutTarget) {
        let present: HashSet<WindowId> = snapshot.ids().collect();
        self.backoff.retain(|id, entry| entry.skipped || present.contains(id));
        let captured = snapshot.captured();
        self.applied
            .retain(|id, write| write.captured == captured && present.contains(id));
        self.stranded
            .retain(|id, task| present.contains(id) || !task.is_finished());
        self.last_snapshot = Some(Arc::clone(snapshot));
        self.last_target = Some(target.clone());
    }

    /// Stranded writes still running.
    pub fn stranded_count(&self) -> usize {
        self.stranded.values().filter(|t| !t.is_finished()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spatial_common::types::Rect;
    use std::time::Duration;

    use crate::snapshot::WindowHandle;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(250),
            max_attempts: 4,
        }
    }

    fn snapshot_of(ids: &[i64]) -> Arc<Snapshot> {
        let windows = ids
            .iter()
            .enumerate()
            .map(|(z, &id)| {
                WindowHandle::new(WindowId(id), Rect::new(0.0, 0.0, 10.0, 10.0), z as u32)
            })
            .collect();
        Arc::new(Snapshot::new(windows, Rect::new(0.0, 0.0, 100.0, 100.0)))
    }

    fn failed(times: u32) -> BackoffEntry {
        let mut entry = BackoffEntry::default();
        for _ in 0..times {
            entry.record_failure(Instant::now(), &policy());
        }
        entry
    }

    #[test]
    fn failures_back_off_then_skip() {
        let mut entry = BackoffEntry::default();
        let now = Instant::now();

        assert_eq!(
            entry.record_failure(now, &policy()),
            FailureVerdict::RetryAt(now + Duration::from_millis(100))
        );
        assert_eq!(
            entry.record_failure(now, &policy()),
            FailureVerdict::RetryAt(now + Duration::from_millis(200))
        );
        assert_eq!(
            entry.record_failure(now, &policy()),
            FailureVerdict::RetryAt(now + Duration::from_millis(250))
        );
        assert_eq!(entry.failures, 3);
        assert!(!entry.skipped);
        assert!(!entry.is_due(now));
        assert!(entry.is_due(now + Duration::from_millis(250)));

        assert_eq!(entry.record_failure(now, &policy()), FailureVerdict::Skipped);
        assert!(entry.skipped);
        assert!(!entry.is_due(now + Duration::from_secs(60)));
    }

    #[test]
    fn default_backoff_clears_the_entry() {
        let mut state = ReconciliationState::new();
        state.set_backoff(WindowId(1), failed(2));
        assert_eq!(state.failures(WindowId(1)), 2);

        state.set_backoff(WindowId(1), BackoffEntry::default());
        assert_eq!(state.failures(WindowId(1)), 0);
        assert!(state.backoff(WindowId(1)).is_none());
    }

    #[test]
    fn finish_cycle_forgets_absent_windows() {
        let mut state = ReconciliationState::new();
        state.set_backoff(WindowId(1), failed(1));
        state.set_backoff(WindowId(2), failed(1));

        state.finish_cycle(&snapshot_of(&[2]), &LayoutTarget::default());

        assert_eq!(state.failures(WindowId(1)), 0);
        assert_eq!(state.failures(WindowId(2)), 1);
        assert!(state.last_snapshot().is_some());
        assert!(state.last_target().is_some());
    }

    #[test]
    fn skipped_window_survives_a_missed_collection() {
        let mut state = ReconciliationState::new();
        state.set_backoff(WindowId(1), failed(4));
        assert!(state.is_skipped(WindowId(1)));

        state.finish_cycle(&snapshot_of(&[]), &LayoutTarget::default());
        state.finish_cycle(&snapshot_of(&[1]), &LayoutTarget::default());

        assert!(state.is_skipped(WindowId(1)));
        assert_eq!(state.failures(WindowId(1)), 4);
    }

    #[test]
    fn applied_memory_lasts_only_for_its_snapshot() {
        let mut state = ReconciliationState::new();
        let first = snapshot_of(&[1]);
        let entry = TargetEntry {
            bounds: Rect::new(0.0, 0.0, 100.0, 100.0),
            z_index: None,
            cell: Some(0),
        };
        state.record_applied(
            WindowId(1),
            AppliedWrite {
                captured: first.captured(),
                target: entry,
            },
        );

        state.finish_cycle(&first, &LayoutTarget::default());
        assert!(state.applied(WindowId(1)).is_some());

        std::thread::sleep(Duration::from_millis(2));
        state.finish_cycle(&snapshot_of(&[1]), &LayoutTarget::default());
        assert!(state.applied(WindowId(1)).is_none());
    }

    #[tokio::test]
    async fn stranded_write_clears_once_finished() {
        let mut state = ReconciliationState::new();
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let task = tokio::task::spawn_blocking(move || {
            let _ = rx.recv();
            Ok(())
        });
        state.strand(WindowId(5), task);
        assert!(state.is_stranded(WindowId(5)));
        assert_eq!(state.stranded_count(), 1);

        tx.send(()).unwrap();
        for _ in 0..100 {
            if !state.is_stranded(WindowId(5)) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!state.is_stranded(WindowId(5)));
        assert_eq!(state.stranded_count(), 0);
    }
}
