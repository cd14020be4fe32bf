use std::sync::Arc;
use std::time::{Duration, Instant};

use spatial_bridge::{AutomationBridge, MemoryBridge};
use spatial_common::errors::BridgeError;
use spatial_common::types::{Rect, WindowId};
use tokio_util::sync::CancellationToken;

use super::*;
use crate::collector::Collector;
use crate::config::{EngineConfig, RetryPolicy};
use crate::planner::{LayoutPlanner, LayoutTarget, TargetEntry};
use crate::snapshot::Snapshot;

fn config() -> EngineConfig {
    EngineConfig {
        interval: Duration::from_secs(1),
        collect_timeout: Duration::from_millis(500),
        write_timeout: Duration::from_millis(200),
        retry: RetryPolicy {
            base_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(80),
            max_attempts: 4,
        },
        ..EngineConfig::default()
    }
}

/// Memory bridge on a 1200x800 screen with `count` overlapping windows.
fn bridge(count: i64) -> Arc<MemoryBridge> {
    let memory = Arc::new(MemoryBridge::new(Rect::new(0.0, 0.0, 1200.0, 800.0)));
    for id in 1..=count {
        memory.open_window(WindowId(id), Rect::new(40.0 * id as f64, 30.0, 500.0, 400.0));
    }
    memory
}

struct Harness {
    memory: Arc<MemoryBridge>,
    collector: Collector,
    planner: LayoutPlanner,
    reconciler: Reconciler,
    state: ReconciliationState,
}

impl Harness {
    fn new(memory: Arc<MemoryBridge>, config: EngineConfig) -> Self {
        let dynamic: Arc<dyn AutomationBridge> = memory.clone();
        Self {
            collector: Collector::new(Arc::clone(&dynamic), &config),
            planner: LayoutPlanner::from_config(&config.layout).unwrap(),
            reconciler: Reconciler::new(dynamic, &config),
            state: ReconciliationState::new(),
            memory,
        }
    }

    async fn snapshot(&self) -> Arc<Snapshot> {
        Arc::new(self.collector.collect().await.unwrap())
    }

    async fn plan(&self, snapshot: &Snapshot) -> LayoutTarget {
        self.planner.plan(snapshot, self.state.last_target()).unwrap()
    }

    async fn cycle(&mut self) -> ReconcileOutcome {
        let snapshot = self.snapshot().await;
        let target = self.plan(&snapshot).await;
        self.reconciler.reconcile(&snapshot, &target, &mut self.state).await
    }
}

fn single_target(id: WindowId, bounds: Rect) -> LayoutTarget {
    let mut target = LayoutTarget::new(None);
    target.insert(
        id,
        TargetEntry {
            bounds,
            z_index: None,
            cell: None,
        },
    );
    target
}

// =============================================================================
// Applying
// =============================================================================

#[tokio::test]
async fn three_windows_take_three_writes() {
    let mut h = Harness::new(bridge(3), config());
    let outcome = h.cycle().await;

    assert_eq!(outcome.applied_count, 3);
    assert!(outcome.is_clean());
    assert_eq!(h.memory.write_count(), 3);

    // Front window (3) gets the first cell.
    assert_eq!(
        h.memory.window(WindowId(3)).unwrap().bounds,
        Rect::new(0.0, 0.0, 600.0, 400.0)
    );
    assert_eq!(
        h.memory.window(WindowId(2)).unwrap().bounds,
        Rect::new(600.0, 0.0, 600.0, 400.0)
    );
    assert_eq!(
        h.memory.window(WindowId(1)).unwrap().bounds,
        Rect::new(0.0, 400.0, 600.0, 400.0)
    );
}

#[tokio::test]
async fn second_cycle_writes_nothing() {
    let mut h = Harness::new(bridge(4), config());
    h.cycle().await;
    h.memory.clear_calls();

    let outcome = h.cycle().await;
    assert_eq!(outcome.applied_count, 0);
    assert_eq!(h.memory.write_count(), 0);
}

#[tokio::test]
async fn same_snapshot_twice_writes_once() {
    let mut h = Harness::new(bridge(2), config());
    let snapshot = h.snapshot().await;
    let target = h.plan(&snapshot).await;

    h.reconciler.reconcile(&snapshot, &target, &mut h.state).await;
    assert_eq!(h.memory.write_count(), 2);

    let outcome = h.reconciler.reconcile(&snapshot, &target, &mut h.state).await;
    assert_eq!(outcome.applied_count, 0);
    assert_eq!(h.memory.write_count(), 2);
}

#[tokio::test]
async fn windows_within_epsilon_are_skipped() {
    let memory = Arc::new(MemoryBridge::new(Rect::new(0.0, 0.0, 1200.0, 800.0)));
    memory.open_window(WindowId(1), Rect::new(1.0, 0.0, 1199.0, 801.5));
    let mut h = Harness::new(memory, config());

    let outcome = h.cycle().await;
    assert_eq!(outcome.applied_count, 0);
    assert_eq!(h.memory.write_count(), 0);
}

#[tokio::test]
async fn user_move_is_corrected_next_cycle() {
    let mut h = Harness::new(bridge(2), config());
    h.cycle().await;
    let placed = h.memory.window(WindowId(1)).unwrap().bounds;

    h.memory
        .update_window(WindowId(1), |w| w.bounds = Rect::new(300.0, 300.0, 200.0, 200.0));
    h.memory.clear_calls();
    let outcome = h.cycle().await;

    assert_eq!(outcome.applied_count, 1);
    assert_eq!(h.memory.window(WindowId(1)).unwrap().bounds, placed);
    assert_eq!(h.memory.bounds_writes(WindowId(1)), vec![placed]);
}

#[tokio::test]
async fn window_restored_to_its_old_bounds_is_arranged_again() {
    let memory = bridge(1);
    let original = memory.window(WindowId(1)).unwrap().bounds;
    let mut h = Harness::new(memory, config());

    h.cycle().await;
    let placed = h.memory.window(WindowId(1)).unwrap().bounds;
    assert_ne!(placed, original);

    // Converged cycle, then the user puts the window back where it was.
    assert_eq!(h.cycle().await.applied_count, 0);
    h.memory.update_window(WindowId(1), |w| w.bounds = original);
    h.memory.clear_calls();

    let outcome = h.cycle().await;
    assert_eq!(outcome.applied_count, 1);
    assert_eq!(h.memory.bounds_writes(WindowId(1)), vec![placed]);
    assert_eq!(h.memory.window(WindowId(1)).unwrap().bounds, placed);
}

#[tokio::test]
async fn raise_on_arrange_reorders_after_bounds() {
    let mut cfg = config();
    cfg.layout.raise_on_arrange = true;
    let memory = bridge(2);
    // Push window 2 behind a minimized window so its rank changes.
    let mut info = spatial_bridge::WindowInfo::new(WindowId(9), Rect::new(0.0, 0.0, 10.0, 10.0), 0);
    info.minimized = true;
    memory.insert_window(info);
    memory.clear_calls();

    let mut h = Harness::new(memory, cfg);
    let outcome = h.cycle().await;
    assert_eq!(outcome.applied_count, 2);

    let calls = h.memory.calls();
    let bounds_at = calls
        .iter()
        .position(|c| matches!(c, spatial_bridge::memory::BridgeCall::SetBounds(WindowId(2), _)))
        .unwrap();
    let raise_at = calls
        .iter()
        .position(|c| matches!(c, spatial_bridge::memory::BridgeCall::SetZIndex(WindowId(2), 0)))
        .unwrap();
    assert!(bounds_at < raise_at);
    assert_eq!(h.memory.window_ids().unwrap()[0], WindowId(2));
}

// =============================================================================
// Failures and backoff
// =============================================================================

#[tokio::test]
async fn two_failures_then_success_within_one_cycle() {
    let memory = bridge(1);
    memory.fail_next_writes(
        WindowId(1),
        [
            BridgeError::Unreachable("busy".into()),
            BridgeError::Unreachable("busy".into()),
        ],
    );
    let mut h = Harness::new(memory, config());

    let started = Instant::now();
    let outcome = h.cycle().await;
    let elapsed = started.elapsed();

    assert_eq!(outcome.applied_count, 1);
    assert!(outcome.failed_ids.is_empty());
    assert_eq!(h.memory.bounds_writes(WindowId(1)).len(), 3);
    assert_eq!(h.state.failures(WindowId(1)), 0);
    // Waited base_delay, then 2 * base_delay.
    assert!(elapsed >= Duration::from_millis(60), "{elapsed:?}");
}

#[tokio::test]
async fn retry_past_deadline_is_deferred_to_a_later_cycle() {
    let mut cfg = config();
    cfg.interval = Duration::from_millis(10);
    cfg.retry.base_delay = Duration::from_millis(100);
    cfg.retry.max_delay = Duration::from_millis(100);
    let memory = bridge(1);
    memory.fail_next_writes(WindowId(1), [BridgeError::Unreachable("busy".into())]);
    let mut h = Harness::new(memory, cfg);

    let outcome = h.cycle().await;
    assert_eq!(outcome.failed_ids, vec![WindowId(1)]);
    assert_eq!(h.state.failures(WindowId(1)), 1);
    assert_eq!(h.memory.write_count(), 1);

    // Still inside the backoff window.
    let outcome = h.cycle().await;
    assert_eq!(outcome.deferred_ids, vec![WindowId(1)]);
    assert_eq!(h.memory.write_count(), 1);

    tokio::time::sleep(Duration::from_millis(120)).await;
    let outcome = h.cycle().await;
    assert_eq!(outcome.applied_count, 1);
    assert_eq!(h.state.failures(WindowId(1)), 0);
}

#[tokio::test]
async fn persistent_failure_is_skipped_after_max_attempts() {
    let memory = bridge(2);
    memory.fail_writes(WindowId(1), Some(BridgeError::Unreachable("stuck".into())));
    let mut h = Harness::new(memory, config());

    let outcome = h.cycle().await;
    assert_eq!(outcome.skipped_ids, vec![WindowId(1)]);
    assert_eq!(outcome.applied_count, 1);
    assert_eq!(h.memory.bounds_writes(WindowId(1)).len(), 4);
    assert!(h.state.is_skipped(WindowId(1)));

    // Never written again this session.
    for _ in 0..3 {
        let outcome = h.cycle().await;
        assert_eq!(outcome.skipped_ids, vec![WindowId(1)]);
    }
    assert_eq!(h.memory.bounds_writes(WindowId(1)).len(), 4);
}

#[tokio::test]
async fn skipped_window_stays_skipped_after_a_missed_read() {
    let memory = bridge(1);
    memory.fail_writes(WindowId(1), Some(BridgeError::Unreachable("stuck".into())));
    let mut h = Harness::new(memory, config());

    h.cycle().await;
    assert!(h.state.is_skipped(WindowId(1)));
    assert_eq!(h.memory.bounds_writes(WindowId(1)).len(), 4);

    // One collection misses the window entirely.
    h.memory.fail_reads(WindowId(1), Some(BridgeError::Unreachable("busy".into())));
    let outcome = h.cycle().await;
    assert!(outcome.skipped_ids.is_empty());

    h.memory.fail_reads(WindowId(1), None);
    let outcome = h.cycle().await;
    assert_eq!(outcome.skipped_ids, vec![WindowId(1)]);
    assert!(h.state.is_skipped(WindowId(1)));
    assert_eq!(h.memory.bounds_writes(WindowId(1)).len(), 4);
}

#[tokio::test]
async fn failure_counter_is_monotonic_until_success() {
    let mut cfg = config();
    cfg.interval = Duration::from_millis(1);
    cfg.retry = RetryPolicy {
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(5),
        max_attempts: 10,
    };
    let memory = bridge(1);
    memory.fail_writes(WindowId(1), Some(BridgeError::Unreachable("stuck".into())));
    let mut h = Harness::new(memory, cfg);

    let mut last = 0;
    for _ in 0..4 {
        h.cycle().await;
        let now = h.state.failures(WindowId(1));
        assert!(now >= last);
        last = now;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(last, 4);

    h.memory.fail_writes(WindowId(1), None);
    h.cycle().await;
    assert_eq!(h.state.failures(WindowId(1)), 0);
}

#[tokio::test]
async fn window_gone_between_plan_and_apply_is_dropped() {
    let mut h = Harness::new(bridge(3), config());
    let snapshot = h.snapshot().await;
    let target = h.plan(&snapshot).await;

    h.memory.close_window(WindowId(2));
    let outcome = h.reconciler.reconcile(&snapshot, &target, &mut h.state).await;

    assert_eq!(outcome.dropped_ids, vec![WindowId(2)]);
    assert!(outcome.failed_ids.is_empty());
    assert_eq!(outcome.applied_count, 2);
    assert_eq!(h.state.failures(WindowId(2)), 0);
}

#[tokio::test]
async fn target_for_unknown_window_is_dropped() {
    let mut h = Harness::new(bridge(1), config());
    let snapshot = h.snapshot().await;
    let target = single_target(WindowId(77), Rect::new(0.0, 0.0, 100.0, 100.0));

    let outcome = h.reconciler.reconcile(&snapshot, &target, &mut h.state).await;
    assert_eq!(outcome.dropped_ids, vec![WindowId(77)]);
    assert_eq!(h.memory.write_count(), 0);
}

#[tokio::test]
async fn closed_window_state_is_cleared() {
    let memory = bridge(2);
    memory.fail_next_writes(WindowId(1), [BridgeError::Unreachable("busy".into())]);
    let mut cfg = config();
    cfg.interval = Duration::from_millis(1);
    let mut h = Harness::new(memory, cfg);

    h.cycle().await;
    assert_eq!(h.state.failures(WindowId(1)), 1);

    h.memory.close_window(WindowId(1));
    h.cycle().await;
    assert!(h.state.backoff(WindowId(1)).is_none());
}

// =============================================================================
// Single flight and concurrency
// =============================================================================

#[tokio::test]
async fn timed_out_write_blocks_the_window_until_it_returns() {
    let mut cfg = config();
    cfg.write_timeout = Duration::from_millis(30);
    cfg.retry.base_delay = Duration::from_millis(1);
    cfg.retry.max_delay = Duration::from_millis(1);
    let memory = bridge(1);
    memory.set_write_latency(WindowId(1), Duration::from_millis(250));
    let mut h = Harness::new(memory, cfg);

    let outcome = h.cycle().await;
    assert_eq!(outcome.failed_ids, vec![WindowId(1)]);
    assert_eq!(h.state.stranded_count(), 1);

    // The stranded call is still running, so no second write goes out.
    h.memory.update_window(WindowId(1), |w| w.bounds = Rect::new(5.0, 5.0, 50.0, 50.0));
    let outcome = h.cycle().await;
    assert_eq!(outcome.deferred_ids, vec![WindowId(1)]);
    assert_eq!(h.memory.bounds_writes(WindowId(1)).len(), 1);

    // Once it lands the window is writable again.
    tokio::time::sleep(Duration::from_millis(300)).await;
    h.memory.set_write_latency(WindowId(1), Duration::ZERO);
    h.memory.update_window(WindowId(1), |w| w.bounds = Rect::new(5.0, 5.0, 50.0, 50.0));
    let outcome = h.cycle().await;
    assert_eq!(outcome.applied_count, 1);
    assert_eq!(h.memory.bounds_writes(WindowId(1)).len(), 2);
}

#[tokio::test]
async fn writes_for_different_windows_overlap() {
    let mut cfg = config();
    cfg.max_concurrent_writes = 4;
    let memory = bridge(4);
    for id in 1..=4 {
        memory.set_write_latency(WindowId(id), Duration::from_millis(100));
    }
    let mut h = Harness::new(memory, cfg);

    let started = Instant::now();
    let outcome = h.cycle().await;
    assert_eq!(outcome.applied_count, 4);
    assert!(started.elapsed() < Duration::from_millis(350));
}

#[tokio::test]
async fn write_concurrency_is_capped() {
    let mut cfg = config();
    cfg.max_concurrent_writes = 1;
    let memory = bridge(3);
    for id in 1..=3 {
        memory.set_write_latency(WindowId(id), Duration::from_millis(50));
    }
    let mut h = Harness::new(memory, cfg);

    let started = Instant::now();
    h.cycle().await;
    assert!(started.elapsed() >= Duration::from_millis(150));
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn cancelled_before_apply_issues_no_writes() {
    let memory = bridge(3);
    let dynamic: Arc<dyn AutomationBridge> = memory.clone();
    let token = CancellationToken::new();
    let reconciler = Reconciler::new(dynamic, &config()).with_cancellation(token.clone());
    let mut h = Harness::new(memory, config());

    let snapshot = h.snapshot().await;
    let target = h.plan(&snapshot).await;
    token.cancel();
    let outcome = reconciler.reconcile(&snapshot, &target, &mut h.state).await;

    assert_eq!(outcome.applied_count, 0);
    assert_eq!(outcome.deferred_ids.len(), 3);
    assert_eq!(h.memory.write_count(), 0);
}

#[tokio::test]
async fn cancellation_lets_in_flight_writes_finish() {
    let mut cfg = config();
    cfg.max_concurrent_writes = 1;
    let memory = bridge(2);
    for id in 1..=2 {
        memory.set_write_latency(WindowId(id), Duration::from_millis(80));
    }
    let dynamic: Arc<dyn AutomationBridge> = memory.clone();
    let token = CancellationToken::new();
    let reconciler = Reconciler::new(dynamic, &cfg).with_cancellation(token.clone());
    let mut h = Harness::new(memory, cfg);

    let snapshot = h.snapshot().await;
    let target = h.plan(&snapshot).await;
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });
    let outcome = reconciler.reconcile(&snapshot, &target, &mut h.state).await;
    canceller.await.unwrap();

    // One write was in flight and completed; the queued one was abandoned.
    assert_eq!(outcome.applied_count, 1);
    assert_eq!(outcome.deferred_ids.len(), 1);
    assert_eq!(h.memory.write_count(), 1);
}
