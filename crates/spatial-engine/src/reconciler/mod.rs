//! Drives the remote side toward a [`LayoutTarget`].
//!
//! Each window's writes run in order inside one job; jobs for different
//! windows run concurrently up to `max_concurrent_writes`. A window never
//! has two writes in flight, also across cycles: a write that outlives its
//! timeout is parked in [`ReconciliationState`] and the window is deferred
//! until that call returns.

mod ops;
mod state;

pub use ops::{coalesce, plan_ops, OpKind, PendingOperation};
pub use state::{BackoffEntry, FailureVerdict, ReconciliationState};

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde::Serialize;
use spatial_bridge::AutomationBridge;
use spatial_common::errors::BridgeError;
use spatial_common::types::WindowId;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::blocking::{self, BridgeTask, CallOutcome};
use crate::config::{EngineConfig, RetryPolicy};
use crate::planner::LayoutTarget;
use crate::snapshot::Snapshot;
use state::AppliedWrite;

/// What one `reconcile` call did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileOutcome {
    /// Windows whose writes all succeeded.
    pub applied_count: usize,
    /// Windows whose writes failed this cycle; retried later.
    pub failed_ids: Vec<WindowId>,
    /// Windows given up on after `max_attempts` consecutive failures.
    pub skipped_ids: Vec<WindowId>,
    /// Windows waiting out a backoff delay or a stranded write, or whose
    /// queued writes were abandoned by cancellation.
    pub deferred_ids: Vec<WindowId>,
    /// Windows that vanished before or during their writes.
    pub dropped_ids: Vec<WindowId>,
}

impl ReconcileOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed_ids.is_empty() && self.skipped_ids.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct ApplySettings {
    epsilon: f64,
    interval: Duration,
    write_timeout: Duration,
    retry: RetryPolicy,
    max_concurrent_writes: usize,
}

/// Work for one window.
struct WindowJob {
    id: WindowId,
    ops: Vec<PendingOperation>,
    backoff: BackoffEntry,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum JobEnd {
    Applied,
    Dropped,
    Failed,
    Skipped,
    Abandoned,
}

struct JobReport {
    id: WindowId,
    end: JobEnd,
    backoff: BackoffEntry,
    stranded: Option<BridgeTask<()>>,
}

/// Applies targets through the bridge. Holds no per-window state itself.
pub struct Reconciler {
    bridge: Arc<dyn AutomationBridge>,
    settings: ApplySettings,
    cancel: CancellationToken,
}

impl Reconciler {
    pub fn new(bridge: Arc<dyn AutomationBridge>, config: &EngineConfig) -> Self {
        Self {
            bridge,
            settings: ApplySettings {
                epsilon: config.epsilon,
                interval: config.interval,
                write_timeout: config.write_timeout,
                retry: config.retry,
                max_concurrent_writes: config.max_concurrent_writes.max(1),
            },
            cancel: CancellationToken::new(),
        }
    }

    /// Stop issuing writes once `token` is cancelled. Writes already in
    /// flight still complete.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Bring every window in `target` toward its target state.
    ///
    /// In-cycle retries must start before the snapshot's capture time plus
    /// `interval`; later retries are left to future cycles.
    pub async fn reconcile(
        &self,
        snapshot: &Arc<Snapshot>,
        target: &LayoutTarget,
        state: &mut ReconciliationState,
    ) -> ReconcileOutcome {
        let now = Instant::now();
        let deadline = snapshot.captured() + self.settings.interval;
        let mut outcome = ReconcileOutcome::default();
        let mut jobs = Vec::new();

        for (id, entry) in target.iter() {
            let Some(current) = snapshot.get(id) else {
                outcome.dropped_ids.push(id);
                continue;
            };
            let backoff = state.backoff(id).cloned().unwrap_or_default();
            if backoff.skipped {
                outcome.skipped_ids.push(id);
                continue;
            }
            if !backoff.is_due(now) || state.is_stranded(id) {
                outcome.deferred_ids.push(id);
                continue;
            }
            let already_applied = state
                .applied(id)
                .is_some_and(|w| w.captured == snapshot.captured() && w.target == *entry);
            if already_applied {
                continue;
            }

            let ops = plan_ops(current, entry, self.settings.epsilon, backoff.failures, deadline);
            if !ops.is_empty() {
                jobs.push(WindowJob { id, ops, backoff });
            }
        }

        if !jobs.is_empty() {
            debug!(windows = jobs.len(), "applying layout");
        }
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_writes));
        let reports = join_all(jobs.into_iter().map(|job| self.run_job(job, &semaphore))).await;

        for report in reports {
            let id = report.id;
            state.set_backoff(id, report.backoff);
            if let Some(task) = report.stranded {
                state.strand(id, task);
            }
            match report.end {
                JobEnd::Applied => {
                    outcome.applied_count += 1;
                    if let Some(entry) = target.get(id) {
                        state.record_applied(
                            id,
                            AppliedWrite {
                                captured: snapshot.captured(),
                                target: entry.clone(),
                            },
                        );
                    }
                }
                JobEnd::Dropped => outcome.dropped_ids.push(id),
                JobEnd::Failed => outcome.failed_ids.push(id),
                JobEnd::Skipped => outcome.skipped_ids.push(id),
                JobEnd::Abandoned => outcome.deferred_ids.push(id),
            }
        }

        state.finish_cycle(snapshot, target);
        outcome
    }

    async fn acquire(&self, semaphore: &Arc<Semaphore>) -> Option<OwnedSemaphorePermit> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            permit = Arc::clone(semaphore).acquire_owned() => permit.ok(),
        }
    }

    async fn run_job(&self, job: WindowJob, semaphore: &Arc<Semaphore>) -> JobReport {
        let WindowJob {
            id,
            ops,
            mut backoff,
        } = job;
        let report = |end, backoff, stranded| JobReport {
            id,
            end,
            backoff,
            stranded,
        };

        for op in ops {
            loop {
                let Some(permit) = self.acquire(semaphore).await else {
                    return report(JobEnd::Abandoned, backoff, None);
                };
                let kind = op.kind;
                let outcome = blocking::call(&self.bridge, self.settings.write_timeout, move |b| {
                    kind.apply(b, id)
                })
                .await;
                drop(permit);

                let (error, stranded) = match outcome {
                    CallOutcome::Done(Ok(())) => {
                        backoff = BackoffEntry::default();
                        break;
                    }
                    CallOutcome::Done(Err(BridgeError::WindowGone(_))) => {
                        debug!(window = %id, op = kind.label(), "window gone, dropping write");
                        return report(JobEnd::Dropped, backoff, None);
                    }
                    CallOutcome::Done(Err(e)) => (e, None),
                    CallOutcome::TimedOut(task) => {
                        (BridgeError::Timeout(self.settings.write_timeout), Some(task))
                    }
                };

                let verdict = backoff.record_failure(Instant::now(), &self.settings.retry);
                warn!(
                    window = %id,
                    op = kind.label(),
                    failures = backoff.failures,
                    error = %error,
                    "remote write failed"
                );
                let retry_at = match verdict {
                    FailureVerdict::Skipped => {
                        warn!(window = %id, "giving up on window after repeated failures");
                        return report(JobEnd::Skipped, backoff, stranded);
                    }
                    FailureVerdict::RetryAt(at) => at,
                };
                // A stranded call still owns the window.
                if stranded.is_some() || retry_at > op.deadline || self.cancel.is_cancelled() {
                    return report(JobEnd::Failed, backoff, stranded);
                }

                let delay = retry_at.saturating_duration_since(Instant::now());
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return report(JobEnd::Failed, backoff, None),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
        report(JobEnd::Applied, backoff, None)
    }
}

#[cfg(test)]
mod tests;
