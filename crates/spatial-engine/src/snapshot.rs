//! Immutable point-in-time view of the remote window set.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use spatial_bridge::WindowInfo;
use spatial_common::types::{Rect, WindowId};

/// One remote window as seen by a single collection.
///
/// The id is a weak reference: the window may already be gone by the time
/// anything acts on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowHandle {
    pub id: WindowId,
    pub bounds: Rect,
    /// Front-to-back rank, front = 0.
    pub z_index: u32,
    pub visible: bool,
    pub minimized: bool,
    pub floating: bool,
    pub resizable: bool,
    pub title: Option<String>,
    /// URL of the page shown, when the remote side reports one.
    pub document_url: Option<String>,
}

impl WindowHandle {
    /// A plain visible, resizable window.
    pub fn new(id: WindowId, bounds: Rect, z_index: u32) -> Self {
        WindowInfo::new(id, bounds, z_index).into()
    }
}

impl From<WindowInfo> for WindowHandle {
    fn from(info: WindowInfo) -> Self {
        Self {
            id: info.id,
            bounds: info.bounds,
            z_index: info.z_index,
            visible: info.visible,
            minimized: info.minimized,
            floating: info.floating,
            resizable: info.resizable,
            title: info.title,
            document_url: info.content_ref,
        }
    }
}

/// Windows in remote z-order (front first) plus the usable screen area.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    windows: Vec<WindowHandle>,
    screen: Rect,
    captured_at: DateTime<Utc>,
    #[serde(skip)]
    captured: Instant,
}

impl Snapshot {
    /// Build a snapshot captured now. `windows` must already be in z-order.
    pub fn new(windows: Vec<WindowHandle>, screen: Rect) -> Self {
        Self {
            windows,
            screen,
            captured_at: Utc::now(),
            captured: Instant::now(),
        }
    }

    pub fn windows(&self) -> &[WindowHandle] {
        &self.windows
    }

    pub fn get(&self, id: WindowId) -> Option<&WindowHandle> {
        self.windows.iter().find(|w| w.id == id)
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.windows.iter().map(|w| w.id)
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Usable area of the screen at capture time.
    pub fn screen(&self) -> Rect {
        self.screen
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Monotonic capture time, used for deadlines.
    pub fn captured(&self) -> Instant {
        self.captured
    }
}
