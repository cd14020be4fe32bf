//! Read-only collection of the remote window set.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use spatial_bridge::{AutomationBridge, WindowInfo};
use spatial_common::errors::BridgeError;
use spatial_common::types::WindowId;
use tokio::time::Instant;
use tracing::debug;

use crate::blocking;
use crate::config::EngineConfig;
use crate::snapshot::{Snapshot, WindowHandle};

/// Builds [`Snapshot`]s through the bridge. Never writes.
pub struct Collector {
    bridge: Arc<dyn AutomationBridge>,
    collect_timeout: Duration,
    max_concurrent_reads: usize,
}

impl Collector {
    pub fn new(bridge: Arc<dyn AutomationBridge>, config: &EngineConfig) -> Self {
        Self {
            bridge,
            collect_timeout: config.collect_timeout,
            max_concurrent_reads: config.max_concurrent_reads.max(1),
        }
    }

    /// Enumerate and read every window within `collect_timeout`.
    ///
    /// Enumeration and screen geometry must both succeed. Per-window read
    /// failures only drop that window; the snapshot holds whichever windows
    /// answered before the deadline.
    pub async fn collect(&self) -> Result<Snapshot, BridgeError> {
        let deadline = Instant::now() + self.collect_timeout;

        let ids = self.remaining_call(deadline, |b| b.window_ids()).await?;
        let screen = self.remaining_call(deadline, |b| b.screen_geometry()).await?;

        let mut read: Vec<(usize, WindowInfo)> = stream::iter(ids.into_iter().enumerate())
            .map(|(order, id)| async move {
                self.read_window(deadline, id).await.map(|info| (order, info))
            })
            .buffer_unordered(self.max_concurrent_reads)
            .filter_map(|entry| async move { entry })
            .collect()
            .await;

        // Remote z-index first, enumeration order breaks ties.
        read.sort_by_key(|(order, info)| (info.z_index, *order));

        let windows = read.into_iter().map(|(_, info)| WindowHandle::from(info)).collect();
        Ok(Snapshot::new(windows, screen))
    }

    async fn remaining_call<T, F>(&self, deadline: Instant, f: F) -> Result<T, BridgeError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn AutomationBridge) -> spatial_bridge::Result<T> + Send + 'static,
    {
        let limit = deadline.saturating_duration_since(Instant::now());
        if limit.is_zero() {
            return Err(BridgeError::Timeout(self.collect_timeout));
        }
        blocking::call(&self.bridge, limit, f)
            .await
            .into_result(self.collect_timeout)
    }

    async fn read_window(&self, deadline: Instant, id: WindowId) -> Option<WindowInfo> {
        match self.remaining_call(deadline, move |b| b.window_info(id)).await {
            Ok(info) => Some(info),
            Err(BridgeError::WindowGone(_)) => None,
            Err(e) => {
                debug!(window = %id, error = %e, "window read failed, leaving it out");
                None
            }
        }
    }
}
