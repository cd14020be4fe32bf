//! AppleScript sources and output parsing for the scripting bridge.
//!
//! Kept free of any process spawning so the script text, the output
//! parsers and the error classifier can be tested on every platform.
//! Scripts return one value per line; window bounds come back as Safari's
//! `{left, top, right, bottom}` in top-left-origin screen points.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use spatial_common::errors::BridgeError;
use spatial_common::types::{Rect, WindowId};

use super::{Result, WindowInfo};

/// AppleEvent reply timeout applied by the system when none is given.
pub const APPLE_EVENT_TIMEOUT: Duration = Duration::from_secs(120);

/// Trailing `(-1728)` style error number in `osascript` stderr.
static ERROR_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((-?\d+)\)\s*$").unwrap());

/// Quote `s` as an AppleScript string literal.
pub fn quote(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Wrap `body` in a `tell` block that refuses to launch the application.
fn tell(application: &str, body: &str) -> String {
    let app = quote(application);
    format!(
        "if application {app} is running then\n\
         tell application {app}\n\
         {body}\n\
         end tell\n\
         else\n\
         error {app} & \" is not running\" number -600\n\
         end if"
    )
}

pub fn window_ids_script(application: &str) -> String {
    tell(
        application,
        "set AppleScript's text item delimiters to linefeed\n\
         return (id of every window) as text",
    )
}

pub fn window_info_script(application: &str, id: WindowId) -> String {
    let body = format!(
        "set w to window id {id}\n\
         set b to bounds of w\n\
         set u to \"\"\n\
         try\n\
         set u to URL of current tab of w\n\
         end try\n\
         if u is missing value then set u to \"\"\n\
         set t to name of w\n\
         if t is missing value then set t to \"\"\n\
         set AppleScript's text item delimiters to linefeed\n\
         return {{id of w, item 1 of b, item 2 of b, item 3 of b, item 4 of b, \
         index of w, visible of w, miniaturized of w, floating of w, \
         resizable of w, u, t}} as text"
    );
    tell(application, &body)
}

pub fn set_bounds_script(application: &str, id: WindowId, bounds: Rect) -> String {
    let b = bounds.round();
    let body = format!(
        "set bounds of window id {id} to {{{}, {}, {}, {}}}",
        b.x,
        b.y,
        b.right(),
        b.bottom()
    );
    tell(application, &body)
}

/// `rank` is zero-based; AppleScript window indices start at 1.
pub fn set_index_script(application: &str, id: WindowId, rank: u32) -> String {
    let body = format!("set index of window id {id} to {}", rank + 1);
    tell(application, &body)
}

/// Main screen frame and visible frame, in AppKit's bottom-left origin.
pub const SCREEN_SCRIPT: &str = r#"use framework "AppKit"
use scripting additions
set s to current application's NSScreen's mainScreen()
set f to s's frame()
set v to s's visibleFrame()
set AppleScript's text item delimiters to linefeed
return {item 1 of item 1 of f, item 2 of item 1 of f, item 1 of item 2 of f, item 2 of item 2 of f, item 1 of item 1 of v, item 2 of item 1 of v, item 1 of item 2 of v, item 2 of item 2 of v} as text"#;

// =============================================================================
// Output parsing
// =============================================================================

fn malformed(what: &str, output: &str) -> BridgeError {
    BridgeError::Unreachable(format!("unexpected {what} output: {:?}", output.trim()))
}

fn number(field: &str) -> Option<f64> {
    field.trim().replace(',', ".").parse().ok()
}

fn flag(field: &str) -> Option<bool> {
    match field.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn optional(field: &str) -> Option<String> {
    let field = field.trim();
    (!field.is_empty()).then(|| field.to_string())
}

pub fn parse_window_ids(output: &str) -> Result<Vec<WindowId>> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| {
            l.parse::<i64>()
                .map(WindowId)
                .map_err(|_| malformed("window id", output))
        })
        .collect()
}

/// Parse a `window_info_script` reply. The title is last and may itself
/// contain line breaks.
pub fn parse_window_info(output: &str) -> Result<WindowInfo> {
    let output = output.trim_end_matches(['\r', '\n']);
    let fields: Vec<&str> = output.splitn(12, '\n').collect();
    if fields.len() < 11 {
        return Err(malformed("window info", output));
    }
    let parse = || -> Option<WindowInfo> {
        let id = WindowId(fields[0].trim().parse().ok()?);
        let (left, top) = (number(fields[1])?, number(fields[2])?);
        let (right, bottom) = (number(fields[3])?, number(fields[4])?);
        let index: u32 = fields[5].trim().parse().ok()?;

        let mut info = WindowInfo::new(
            id,
            Rect::new(left, top, right - left, bottom - top),
            index.saturating_sub(1),
        );
        info.visible = flag(fields[6])?;
        info.minimized = flag(fields[7])?;
        info.floating = flag(fields[8])?;
        info.resizable = flag(fields[9])?;
        info.content_ref = optional(fields[10]);
        info.title = fields.get(11).and_then(|t| optional(t));
        Some(info)
    };
    parse().ok_or_else(|| malformed("window info", output))
}

/// Parse [`SCREEN_SCRIPT`] output into the visible frame in top-left
/// origin coordinates.
pub fn parse_screen(output: &str) -> Result<Rect> {
    let values: Option<Vec<f64>> = output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(number)
        .collect();
    match values.as_deref() {
        Some([_, _, _, frame_h, vx, vy, vw, vh]) => {
            Ok(Rect::new(*vx, frame_h - (vy + vh), *vw, *vh))
        }
        _ => Err(malformed("screen", output)),
    }
}

// =============================================================================
// Error classification
// =============================================================================

/// Map `osascript` stderr to a [`BridgeError`].
///
/// `window` is the window the script addressed, if any; missing-object
/// errors only mean `WindowGone` when a specific window was addressed.
pub fn classify_error(stderr: &str, window: Option<WindowId>) -> BridgeError {
    let message = stderr.trim().to_string();
    let code = ERROR_NUMBER_RE
        .captures(&message)
        .and_then(|c| c[1].parse::<i32>().ok());

    match (code, window) {
        (Some(-600), _) => BridgeError::Unreachable(message),
        (Some(-1743), _) => BridgeError::PermissionDenied(message),
        (Some(-1728 | -1719), Some(id)) => BridgeError::WindowGone(id),
        (Some(-1712), _) => BridgeError::Timeout(APPLE_EVENT_TIMEOUT),
        _ => BridgeError::Unreachable(message),
    }
}
