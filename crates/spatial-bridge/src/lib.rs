//! The automation boundary between the arrangement engine and the remote
//! application whose windows it arranges.
//!
//! Everything behind [`AutomationBridge`] is blocking, stateless and
//! allowed to fail or hang on any call. Callers own timeouts and retries.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use spatial_common::errors::BridgeError;
use spatial_common::types::{Rect, WindowId};

#[cfg(target_os = "macos")]
pub mod macos;

pub mod memory;
pub mod noop;
pub mod script;

pub use memory::MemoryBridge;
pub use noop::NoopBridge;

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Properties of one remote window as read through the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub id: WindowId,
    pub bounds: Rect,
    /// Front-to-back rank, front = 0.
    pub z_index: u32,
    pub visible: bool,
    pub minimized: bool,
    pub floating: bool,
    /// Whether the remote side accepts size changes.
    pub resizable: bool,
    pub title: Option<String>,
    /// Best-effort reference to the displayed content (a URL for browsers).
    pub content_ref: Option<String>,
}

impl WindowInfo {
    /// A plain visible, resizable window with no title or content.
    pub fn new(id: WindowId, bounds: Rect, z_index: u32) -> Self {
        Self {
            id,
            bounds,
            z_index,
            visible: true,
            minimized: false,
            floating: false,
            resizable: true,
            title: None,
            content_ref: None,
        }
    }
}

/// Change pushed by a bridge that can observe the remote window set.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowEvent {
    Created(WindowId),
    Destroyed(WindowId),
    Moved(WindowId, Rect),
}

pub type WindowCallback = Box<dyn Fn(WindowEvent) + Send + Sync>;

/// Keeps a `watch_windows` subscription alive; dropping it unsubscribes.
pub struct WatchHandle {
    _inner: Box<dyn std::any::Any + Send>,
}

impl WatchHandle {
    pub fn new(inner: impl std::any::Any + Send + 'static) -> Self {
        Self {
            _inner: Box::new(inner),
        }
    }
}

/// Capability-typed interface to a scriptable application's windows.
///
/// Implementations must be callable from several threads at once; they
/// must not assume the remote side serializes calls.
pub trait AutomationBridge: Send + Sync {
    /// Enumerate the ids of the application's windows.
    fn window_ids(&self) -> Result<Vec<WindowId>>;

    /// Read one window's properties.
    fn window_info(&self, id: WindowId) -> Result<WindowInfo>;

    /// Write a window's origin and size in one call.
    fn set_bounds(&self, id: WindowId, bounds: Rect) -> Result<()>;

    /// Move a window to front-to-back rank `rank` (front = 0).
    fn set_z_index(&self, id: WindowId, rank: u32) -> Result<()>;

    /// Usable area of the main screen (menu bar and dock excluded).
    fn screen_geometry(&self) -> Result<Rect>;

    /// Enumerate and read every window. Windows that close mid-read are
    /// omitted; any other failure fails the whole call.
    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        let mut windows = Vec::new();
        for id in self.window_ids()? {
            match self.window_info(id) {
                Ok(info) => windows.push(info),
                Err(BridgeError::WindowGone(_)) => {}
                Err(e) => return Err(e),
            }
        }
        windows.sort_by_key(|w| w.z_index);
        Ok(windows)
    }

    /// Subscribe to window set changes. Bridges that cannot observe the
    /// remote side return `NotSupported` and callers fall back to polling.
    fn watch_windows(&self, _callback: WindowCallback) -> Result<WatchHandle> {
        Err(BridgeError::NotSupported("window events".into()))
    }
}

/// Which bridge implementation to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeKind {
    /// AppleScript against the configured application (macOS only).
    Script,
    /// In-process simulated window server.
    Memory,
    /// No windows; every write succeeds.
    Noop,
}

/// Create a bridge of the requested kind for `application`.
///
/// `Script` falls back to the no-op bridge on platforms without
/// AppleScript.
pub fn create_bridge(kind: BridgeKind, application: &str) -> Arc<dyn AutomationBridge> {
    match kind {
        BridgeKind::Script => create_script_bridge(application),
        BridgeKind::Memory => Arc::new(MemoryBridge::demo()),
        BridgeKind::Noop => Arc::new(NoopBridge),
    }
}

#[cfg(target_os = "macos")]
fn create_script_bridge(application: &str) -> Arc<dyn AutomationBridge> {
    Arc::new(macos::AppleScriptBridge::new(application))
}

#[cfg(not(target_os = "macos"))]
fn create_script_bridge(application: &str) -> Arc<dyn AutomationBridge> {
    tracing::warn!(
        application,
        "AppleScript is unavailable on this platform, using the no-op bridge"
    );
    Arc::new(NoopBridge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_info_defaults() {
        let info = WindowInfo::new(WindowId(3), Rect::new(0.0, 0.0, 640.0, 480.0), 1);
        assert!(info.visible);
        assert!(info.resizable);
        assert!(!info.minimized);
        assert!(!info.floating);
        assert!(info.title.is_none());
    }

    #[test]
    fn window_info_serialization() {
        let mut info = WindowInfo::new(WindowId(9), Rect::new(10.0, 20.0, 300.0, 200.0), 0);
        info.content_ref = Some("https://example.org/".into());
        let json = serde_json::to_string(&info).unwrap();
        let deserialized: WindowInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(info, deserialized);
    }

    #[test]
    fn watch_handle_creation() {
        let _handle = WatchHandle::new(42u32);
    }

    #[test]
    fn bridge_kind_parses_lowercase() {
        let kind: BridgeKind = serde_json::from_str("\"memory\"").unwrap();
        assert_eq!(kind, BridgeKind::Memory);
    }

    #[test]
    fn create_bridge_memory_has_windows() {
        let bridge = create_bridge(BridgeKind::Memory, "Safari");
        assert!(!bridge.window_ids().unwrap().is_empty());
    }

    #[test]
    fn create_bridge_noop_returns_empty() {
        let bridge = create_bridge(BridgeKind::Noop, "Safari");
        assert!(bridge.list_windows().unwrap().is_empty());
    }

    #[test]
    fn list_windows_sorts_by_z_index_and_skips_gone() {
        let bridge = MemoryBridge::new(Rect::new(0.0, 0.0, 1000.0, 800.0));
        bridge.open_window(WindowId(1), Rect::new(0.0, 0.0, 100.0, 100.0));
        bridge.open_window(WindowId(2), Rect::new(0.0, 0.0, 100.0, 100.0));
        let windows = bridge.list_windows().unwrap();
        // Most recently opened window is frontmost.
        assert_eq!(windows[0].id, WindowId(2));
        assert_eq!(windows[1].id, WindowId(1));
    }

    #[test]
    fn default_watch_is_not_supported() {
        let bridge = NoopBridge;
        let result = bridge.watch_windows(Box::new(|_| {}));
        assert!(matches!(result, Err(BridgeError::NotSupported(_))));
    }
}
