//! Running blocking bridge calls from async code under a time limit.

use std::sync::Arc;
use std::time::Duration;

use spatial_bridge::AutomationBridge;
use spatial_common::errors::BridgeError;
use tokio::task::JoinHandle;

/// A bridge call running on tokio's blocking pool.
pub(crate) type BridgeTask<T> = JoinHandle<spatial_bridge::Result<T>>;

/// Result of [`call`].
pub(crate) enum CallOutcome<T> {
    /// The call returned within the limit.
    Done(spatial_bridge::Result<T>),
    /// The limit passed first. The call keeps running on its worker
    /// thread; the handle reports when it finally returns.
    TimedOut(BridgeTask<T>),
}

impl<T> CallOutcome<T> {
    /// Collapse into a plain result, detaching a timed-out call.
    pub(crate) fn into_result(self, limit: Duration) -> spatial_bridge::Result<T> {
        match self {
            CallOutcome::Done(result) => result,
            CallOutcome::TimedOut(_) => Err(BridgeError::Timeout(limit)),
        }
    }
}

/// Run `f` against `bridge` on the blocking pool, waiting at most `limit`.
pub(crate) async fn call<T, F>(
    bridge: &Arc<dyn AutomationBridge>,
    limit: Duration,
    f: F,
) -> CallOutcome<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn AutomationBridge) -> spatial_bridge::Result<T> + Send + 'static,
{
    let bridge = Arc::clone(bridge);
    let mut task = tokio::task::spawn_blocking(move || f(bridge.as_ref()));

    match tokio::time::timeout(limit, &mut task).await {
        Ok(Ok(result)) => CallOutcome::Done(result),
        Ok(Err(e)) => CallOutcome::Done(Err(BridgeError::Unreachable(format!(
            "bridge call panicked: {e}"
        )))),
        Err(_) => CallOutcome::TimedOut(task),
    }
}
