//! Decides when cycles run.
//!
//! Cycles run on a fixed tick and on demand: `trigger_now()`, a change in
//! the number of windows, or a create/destroy event pushed by the bridge.
//! Triggers that arrive while a cycle runs collapse into one follow-up
//! cycle. Cycles never overlap.

mod cycle;
mod phase;
mod report;

pub use cycle::CycleRunner;
pub use phase::Phase;
pub use report::CycleReport;

use std::sync::Arc;
use std::time::Duration;

use spatial_bridge::{AutomationBridge, WatchHandle, WindowEvent};
use spatial_common::errors::BridgeError;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;

/// Called once per finished or skipped cycle.
pub type CycleObserver = Arc<dyn Fn(&CycleReport) + Send + Sync>;

/// Entry point for the background arrangement loop.
pub struct Scheduler;

impl Scheduler {
    /// Spawn the scheduler loop on the current tokio runtime. The first
    /// cycle runs immediately.
    pub fn start<F>(
        config: EngineConfig,
        bridge: Arc<dyn AutomationBridge>,
        observer: F,
    ) -> SchedulerHandle
    where
        F: Fn(&CycleReport) + Send + Sync + 'static,
    {
        let cancel = CancellationToken::new();
        let trigger = Arc::new(Notify::new());
        let (config_tx, config_rx) = watch::channel(config.clone());

        let runner = CycleRunner::new(config, Arc::clone(&bridge)).with_cancellation(cancel.clone());
        let phase_rx = runner.subscribe_phase();
        let watch = subscribe_events(bridge.as_ref(), &trigger);

        let task = tokio::spawn(run_loop(LoopContext {
            runner,
            observer: Arc::new(observer),
            cancel: cancel.clone(),
            trigger: Arc::clone(&trigger),
            config_rx,
            _watch: watch,
        }));

        SchedulerHandle {
            cancel,
            trigger,
            config_tx,
            phase_rx,
            task,
        }
    }

    /// Run a single cycle without spawning the loop.
    pub async fn run_once(config: EngineConfig, bridge: Arc<dyn AutomationBridge>) -> CycleReport {
        CycleRunner::new(config, bridge).run().await
    }
}

/// Wire bridge window events to the trigger, when the bridge has them.
fn subscribe_events(bridge: &dyn AutomationBridge, trigger: &Arc<Notify>) -> Option<WatchHandle> {
    let trigger = Arc::clone(trigger);
    let callback = Box::new(move |event: WindowEvent| match event {
        WindowEvent::Created(_) | WindowEvent::Destroyed(_) => trigger.notify_one(),
        WindowEvent::Moved(..) => {}
    });
    match bridge.watch_windows(callback) {
        Ok(handle) => {
            debug!("subscribed to bridge window events");
            Some(handle)
        }
        Err(BridgeError::NotSupported(_)) => {
            debug!("bridge has no window events, polling only");
            None
        }
        Err(e) => {
            warn!(error = %e, "window event subscription failed, polling only");
            None
        }
    }
}

/// Control surface of a running scheduler.
pub struct SchedulerHandle {
    cancel: CancellationToken,
    trigger: Arc<Notify>,
    config_tx: watch::Sender<EngineConfig>,
    phase_rx: watch::Receiver<Phase>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Request a cycle as soon as the current one (if any) finishes.
    pub fn trigger_now(&self) {
        self.trigger.notify_one();
    }

    /// Use `config` from the next cycle on.
    pub fn update_config(&self, config: EngineConfig) {
        self.config_tx.send_replace(config);
    }

    pub fn phase(&self) -> Phase {
        *self.phase_rx.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<Phase> {
        self.phase_rx.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the loop and wait for it. A running cycle finishes its
    /// in-flight writes; queued writes are abandoned.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "scheduler task ended abnormally");
        }
    }
}

struct LoopContext {
    runner: CycleRunner,
    observer: CycleObserver,
    cancel: CancellationToken,
    trigger: Arc<Notify>,
    config_rx: watch::Receiver<EngineConfig>,
    /// Dropping it ends the bridge event subscription.
    _watch: Option<WatchHandle>,
}

fn tick_interval(period: Duration) -> Interval {
    let period = period.max(Duration::from_millis(1));
    tokio::time::interval_at(Instant::now() + period, period)
}

async fn run_loop(mut ctx: LoopContext) {
    info!(interval_ms = ctx.runner.config().interval.as_millis() as u64, "scheduler started");
    let mut ticker = tick_interval(ctx.runner.config().interval);
    let mut config_open = true;
    // First cycle right away.
    ctx.trigger.notify_one();

    loop {
        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            changed = ctx.config_rx.changed(), if config_open => {
                if changed.is_err() {
                    config_open = false;
                    continue;
                }
                let config = ctx.config_rx.borrow_and_update().clone();
                if config.interval != ctx.runner.config().interval {
                    ticker = tick_interval(config.interval);
                }
                ctx.runner.reconfigure(config);
                info!("scheduler configuration updated");
                continue;
            }
            _ = ctx.trigger.notified() => {}
            _ = ticker.tick() => {}
        }

        let report = ctx.runner.run().await;
        (ctx.observer)(&report);

        // Count changes get one follow-up; the tick restarts after each cycle.
        if ctx.runner.window_count_changed() {
            ctx.trigger.notify_one();
        }
        ticker.reset();
    }

    ctx.runner.set_phase(Phase::Stopped);
    info!("scheduler stopped");
}
