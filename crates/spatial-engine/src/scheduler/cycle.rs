//! One collect, plan and apply pass.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use spatial_bridge::AutomationBridge;
use spatial_common::errors::{BridgeError, PlanError};
use spatial_common::CycleId;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

use super::phase::Phase;
use super::report::CycleReport;
use crate::collector::Collector;
use crate::config::EngineConfig;
use crate::planner::LayoutPlanner;
use crate::reconciler::{ReconciliationState, Reconciler};
use crate::snapshot::Snapshot;

/// Owns the stages and the reconciliation state, and runs cycles one at
/// a time.
pub struct CycleRunner {
    bridge: Arc<dyn AutomationBridge>,
    config: EngineConfig,
    collector: Collector,
    /// A misconfigured policy is reported by every cycle until the config
    /// changes.
    planner: Result<LayoutPlanner, PlanError>,
    reconciler: Reconciler,
    state: ReconciliationState,
    cancel: CancellationToken,
    phase: watch::Sender<Phase>,
    last_window_count: Option<usize>,
    window_count_changed: bool,
}

impl CycleRunner {
    pub fn new(config: EngineConfig, bridge: Arc<dyn AutomationBridge>) -> Self {
        let cancel = CancellationToken::new();
        let (phase, _) = watch::channel(Phase::Idle);
        Self {
            collector: Collector::new(Arc::clone(&bridge), &config),
            planner: LayoutPlanner::from_config(&config.layout),
            reconciler: Reconciler::new(Arc::clone(&bridge), &config)
                .with_cancellation(cancel.clone()),
            bridge,
            config,
            state: ReconciliationState::new(),
            cancel,
            phase,
            last_window_count: None,
            window_count_changed: false,
        }
    }

    /// Abandon queued writes once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self.rebuild();
        self
    }

    /// Swap in a new configuration. Reconciliation state is kept.
    pub fn reconfigure(&mut self, config: EngineConfig) {
        self.config = config;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.collector = Collector::new(Arc::clone(&self.bridge), &self.config);
        self.planner = LayoutPlanner::from_config(&self.config.layout);
        match &self.planner {
            Ok(planner) => debug!(policy = planner.policy_name(), "layout planner ready"),
            Err(e) => warn!(error = %e, "layout policy unusable until the config changes"),
        }
        self.reconciler = Reconciler::new(Arc::clone(&self.bridge), &self.config)
            .with_cancellation(self.cancel.clone());
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &ReconciliationState {
        &self.state
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        self.phase.send_replace(phase);
    }

    /// Whether the last successful collection saw a different number of
    /// windows than the one before it.
    pub fn window_count_changed(&self) -> bool {
        self.window_count_changed
    }

    /// Collect a snapshot without planning or writing.
    pub async fn collect(&self) -> Result<Snapshot, BridgeError> {
        self.collector.collect().await
    }

    /// Run one full cycle and report what it did.
    pub async fn run(&mut self) -> CycleReport {
        let cycle_id = CycleId::new();
        let span = tracing::info_span!("cycle", id = %cycle_id);
        let started = Instant::now();
        let mut report = CycleReport::new(cycle_id, Utc::now());

        self.run_stages(&mut report).instrument(span).await;

        self.set_phase(Phase::Idle);
        report.duration_ms = started.elapsed().as_millis() as u64;
        report
    }

    async fn run_stages(&mut self, report: &mut CycleReport) {
        self.window_count_changed = false;

        self.set_phase(Phase::Collecting);
        let snapshot = match self.collector.collect().await {
            Ok(snapshot) => Arc::new(snapshot),
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "collection failed, skipping cycle");
                report.error = Some(e.to_string());
                return;
            }
        };
        report.window_count = snapshot.len();
        self.window_count_changed = self
            .last_window_count
            .is_some_and(|previous| previous != snapshot.len());
        self.last_window_count = Some(snapshot.len());

        self.set_phase(Phase::Planning);
        let planned = match &self.planner {
            Ok(planner) => planner.plan(&snapshot, self.state.last_target()),
            Err(e) => Err(e.clone()),
        };
        let target = match planned {
            Ok(target) => target,
            Err(e) => {
                warn!(error = %e, "planning failed, nothing applied");
                report.error = Some(e.to_string());
                return;
            }
        };

        self.set_phase(Phase::Applying);
        let outcome = self
            .reconciler
            .reconcile(&snapshot, &target, &mut self.state)
            .await;
        if outcome.applied_count > 0 || !outcome.is_clean() {
            info!(
                windows = snapshot.len(),
                applied = outcome.applied_count,
                failed = outcome.failed_ids.len(),
                skipped = outcome.skipped_ids.len(),
                "cycle applied"
            );
        }
        report.absorb(outcome);
    }
}
