//! `AutomationBridge` implementation over `osascript`.

use std::process::Command;

use spatial_common::errors::BridgeError;
use spatial_common::types::{Rect, WindowId};

use crate::script;
use crate::{AutomationBridge, Result, WindowInfo};

use super::AppleScriptBridge;

/// Run `source` with `osascript` and return its stdout.
///
/// `window` names the window the script addresses so missing-object
/// errors can be reported as `WindowGone`.
fn run(source: &str, window: Option<WindowId>) -> Result<String> {
    let output = Command::new("osascript")
        .arg("-e")
        .arg(source)
        .output()
        .map_err(|e| BridgeError::Unreachable(format!("osascript failed to start: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let error = script::classify_error(&stderr, window);
        tracing::debug!(kind = error.kind(), stderr = %stderr.trim(), "osascript failed");
        return Err(error);
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

impl AutomationBridge for AppleScriptBridge {
    fn window_ids(&self) -> Result<Vec<WindowId>> {
        let stdout = run(&script::window_ids_script(&self.application), None)?;
        script::parse_window_ids(&stdout)
    }

    fn window_info(&self, id: WindowId) -> Result<WindowInfo> {
        let stdout = run(&script::window_info_script(&self.application, id), Some(id))?;
        script::parse_window_info(&stdout)
    }

    fn set_bounds(&self, id: WindowId, bounds: Rect) -> Result<()> {
        run(&script::set_bounds_script(&self.application, id, bounds), Some(id)).map(drop)
    }

    fn set_z_index(&self, id: WindowId, rank: u32) -> Result<()> {
        run(&script::set_index_script(&self.application, id, rank), Some(id)).map(drop)
    }

    fn screen_geometry(&self) -> Result<Rect> {
        let stdout = run(script::SCREEN_SCRIPT, None)?;
        script::parse_screen(&stdout)
    }
}
