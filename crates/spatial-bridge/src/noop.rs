//! No-op bridge.
//!
//! Used as a fallback on platforms without a scripting bridge.

use spatial_common::errors::BridgeError;
use spatial_common::types::{Rect, WindowId};

use super::{AutomationBridge, Result, WindowInfo};

/// Usable area reported by [`NoopBridge`].
pub const NOOP_SCREEN: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: 1440.0,
    height: 900.0,
};

/// A bridge that sees no windows. Writes succeed silently.
pub struct NoopBridge;

impl AutomationBridge for NoopBridge {
    fn window_ids(&self) -> Result<Vec<WindowId>> {
        Ok(Vec::new())
    }

    fn window_info(&self, id: WindowId) -> Result<WindowInfo> {
        Err(BridgeError::WindowGone(id))
    }

    fn set_bounds(&self, _id: WindowId, _bounds: Rect) -> Result<()> {
        Ok(())
    }

    fn set_z_index(&self, _id: WindowId, _rank: u32) -> Result<()> {
        Ok(())
    }

    fn screen_geometry(&self) -> Result<Rect> {
        Ok(NOOP_SCREEN)
    }
}
