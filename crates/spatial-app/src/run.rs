//! Runtime side of the binary: one-shot modes and the long-running loop.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use serde::Serialize;
use spatial_bridge::{create_bridge, AutomationBridge};
use spatial_config::{ReloadManager, SpatialConfig};
use spatial_engine::{CycleReport, CycleRunner, EngineConfig, Scheduler, SchedulerHandle};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::cli::Args;

pub async fn run(args: Args, config: SpatialConfig) -> ExitCode {
    let engine_config = EngineConfig::from(&config);
    let bridge = create_bridge(args.bridge.into(), &config.target.application);
    info!(bridge = ?args.bridge, "bridge ready");

    if args.list {
        return list(engine_config, bridge).await;
    }
    if args.once {
        let report = Scheduler::run_once(engine_config, bridge).await;
        print_json(&report);
        return if report.error.is_none() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    let handle = Scheduler::start(engine_config, bridge, log_report);
    let config_path = args
        .config
        .or_else(|| spatial_config::toml_loader::default_config_path().ok());
    serve(handle, config_path).await;
    ExitCode::SUCCESS
}

async fn list(config: EngineConfig, bridge: Arc<dyn AutomationBridge>) -> ExitCode {
    match CycleRunner::new(config, bridge).collect().await {
        Ok(snapshot) => {
            print_json(&snapshot);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(kind = e.kind(), "Failed to collect windows: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => error!("Failed to serialize output: {e}"),
    }
}

fn log_report(report: &CycleReport) {
    if let Some(ref e) = report.error {
        warn!(cycle = %report.cycle_id, "cycle skipped: {e}");
        return;
    }
    info!(
        cycle = %report.cycle_id,
        windows = report.window_count,
        applied = report.applied_count,
        failed = report.failed_ids.len(),
        skipped = report.skipped_ids.len(),
        deferred = report.deferred_ids.len(),
        duration_ms = report.duration_ms,
        "cycle finished"
    );
}

/// Drive the scheduler until Ctrl-C, forwarding config reloads and
/// manual triggers.
async fn serve(handle: SchedulerHandle, config_path: Option<PathBuf>) {
    let mut reloads = match config_path {
        Some(path) => {
            info!("Watching config at {}", path.display());
            let (_, rx) = ReloadManager::start(path).await;
            Some(rx)
        }
        None => None,
    };
    let mut trigger = TriggerSignal::new();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            biased;
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    error!("Failed to listen for Ctrl-C: {e}");
                }
                info!("Ctrl-C received, stopping");
                break;
            }
            changed = next_config(&mut reloads) => match changed {
                Some(config) => {
                    info!("Config reloaded, applying from next cycle");
                    handle.update_config(EngineConfig::from(&config));
                }
                None => reloads = None,
            },
            _ = trigger.recv() => {
                info!("Manual trigger received");
                handle.trigger_now();
            }
        }
    }

    handle.stop().await;
}

/// Next reloaded config, or `None` once the reload manager is gone.
/// Never resolves without a receiver.
async fn next_config(rx: &mut Option<watch::Receiver<SpatialConfig>>) -> Option<SpatialConfig> {
    let Some(rx) = rx.as_mut() else {
        return std::future::pending().await;
    };
    match rx.changed().await {
        Ok(()) => Some(rx.borrow_and_update().clone()),
        Err(_) => None,
    }
}

/// `SIGUSR1` requests an immediate cycle.
#[cfg(unix)]
struct TriggerSignal(Option<tokio::signal::unix::Signal>);

#[cfg(unix)]
impl TriggerSignal {
    fn new() -> Self {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::user_defined1()) {
            Ok(sig) => Self(Some(sig)),
            Err(e) => {
                warn!("Failed to install SIGUSR1 handler: {e}");
                Self(None)
            }
        }
    }

    async fn recv(&mut self) {
        match self.0.as_mut() {
            Some(sig) => {
                if sig.recv().await.is_none() {
                    self.0 = None;
                    std::future::pending::<()>().await;
                }
            }
            None => std::future::pending().await,
        }
    }
}

#[cfg(not(unix))]
struct TriggerSignal;

#[cfg(not(unix))]
impl TriggerSignal {
    fn new() -> Self {
        Self
    }

    async fn recv(&mut self) {
        std::future::pending().await
    }
}
