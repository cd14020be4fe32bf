//! In-process simulated window server.
//!
//! [`MemoryBridge`] keeps a z-ordered window list behind a mutex and
//! applies writes to it, so the engine can run end to end without a
//! scriptable application. Latency and failures can be injected per call
//! kind and per window, and every call is logged for inspection.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use spatial_common::errors::BridgeError;
use spatial_common::types::{Rect, WindowId};

use super::{AutomationBridge, Result, WatchHandle, WindowCallback, WindowEvent, WindowInfo};

/// One call received by a [`MemoryBridge`].
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeCall {
    WindowIds,
    WindowInfo(WindowId),
    SetBounds(WindowId, Rect),
    SetZIndex(WindowId, u32),
    ScreenGeometry,
}

#[derive(Default)]
struct Faults {
    enumerate: Option<BridgeError>,
    screen: Option<BridgeError>,
    /// Failures consumed one per write, in order.
    queued_writes: HashMap<WindowId, VecDeque<BridgeError>>,
    /// Failures returned for every write until cleared.
    sticky_writes: HashMap<WindowId, BridgeError>,
    reads: HashMap<WindowId, BridgeError>,
}

#[derive(Default)]
struct Latency {
    enumerate: Duration,
    reads: HashMap<WindowId, Duration>,
    writes: HashMap<WindowId, Duration>,
}

struct MemoryState {
    /// Front to back.
    windows: Vec<WindowInfo>,
    screen: Rect,
    faults: Faults,
    latency: Latency,
    calls: Vec<BridgeCall>,
}

type Subscribers = Mutex<Vec<(u64, Arc<WindowCallback>)>>;

/// Simulated window server implementing [`AutomationBridge`].
pub struct MemoryBridge {
    state: Mutex<MemoryState>,
    subscribers: Arc<Subscribers>,
    next_subscriber: Mutex<u64>,
}

/// Unregisters a subscriber when its [`WatchHandle`] drops.
struct Subscription {
    id: u64,
    subscribers: Weak<Subscribers>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            if let Ok(mut subs) = subscribers.lock() {
                subs.retain(|(id, _)| *id != self.id);
            }
        }
    }
}

impl MemoryBridge {
    /// An empty window server with the given usable screen area.
    pub fn new(screen: Rect) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                windows: Vec::new(),
                screen,
                faults: Faults::default(),
                latency: Latency::default(),
                calls: Vec::new(),
            }),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            next_subscriber: Mutex::new(0),
        }
    }

    /// A 1440x875 desktop with four overlapping browser windows.
    pub fn demo() -> Self {
        let bridge = Self::new(Rect::new(0.0, 25.0, 1440.0, 875.0));
        let pages = [
            "https://www.apple.com/safari/",
            "https://www.rust-lang.org/",
            "https://docs.rs/",
            "https://crates.io/",
        ];
        for (i, page) in pages.iter().enumerate() {
            let offset = 40.0 * i as f64;
            let mut info = WindowInfo::new(
                WindowId(1000 + i as i64),
                Rect::new(80.0 + offset, 60.0 + offset, 900.0, 640.0),
                0,
            );
            info.content_ref = Some((*page).to_string());
            info.title = Some(format!("Window {}", i + 1));
            bridge.insert_window(info);
        }
        bridge.clear_calls();
        bridge
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test thread panicked mid-call; the
        // window list itself is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // -- Window set --

    /// Open a plain window in front of all others.
    pub fn open_window(&self, id: WindowId, bounds: Rect) {
        self.insert_window(WindowInfo::new(id, bounds, 0));
    }

    /// Insert `info` at its `z_index` (clamped to the back).
    pub fn insert_window(&self, info: WindowInfo) {
        let id = info.id;
        {
            let mut state = self.lock();
            state.windows.retain(|w| w.id != id);
            let at = (info.z_index as usize).min(state.windows.len());
            state.windows.insert(at, info);
            renumber(&mut state.windows);
        }
        self.publish(WindowEvent::Created(id));
    }

    /// Close a window. Later calls addressing it fail with `WindowGone`.
    pub fn close_window(&self, id: WindowId) {
        let removed = {
            let mut state = self.lock();
            let before = state.windows.len();
            state.windows.retain(|w| w.id != id);
            renumber(&mut state.windows);
            state.windows.len() != before
        };
        if removed {
            self.publish(WindowEvent::Destroyed(id));
        }
    }

    /// Apply `f` to a window's properties, as if changed by the user.
    pub fn update_window(&self, id: WindowId, f: impl FnOnce(&mut WindowInfo)) {
        let moved = {
            let mut state = self.lock();
            state.windows.iter_mut().find(|w| w.id == id).map(|w| {
                let before = w.bounds;
                f(w);
                (before != w.bounds).then_some(w.bounds)
            })
        };
        if let Some(Some(bounds)) = moved {
            self.publish(WindowEvent::Moved(id, bounds));
        }
    }

    pub fn window(&self, id: WindowId) -> Option<WindowInfo> {
        self.lock().windows.iter().find(|w| w.id == id).cloned()
    }

    pub fn windows(&self) -> Vec<WindowInfo> {
        self.lock().windows.clone()
    }

    pub fn set_screen(&self, screen: Rect) {
        self.lock().screen = screen;
    }

    // -- Fault injection --

    /// Fail the next writes to `id` with `errors`, one per write.
    pub fn fail_next_writes(&self, id: WindowId, errors: impl IntoIterator<Item = BridgeError>) {
        self.lock()
            .faults
            .queued_writes
            .entry(id)
            .or_default()
            .extend(errors);
    }

    /// Fail every write to `id` with `error` until cleared with `None`.
    pub fn fail_writes(&self, id: WindowId, error: Option<BridgeError>) {
        let mut state = self.lock();
        match error {
            Some(e) => state.faults.sticky_writes.insert(id, e),
            None => state.faults.sticky_writes.remove(&id),
        };
    }

    /// Fail every read of `id` with `error` until cleared with `None`.
    pub fn fail_reads(&self, id: WindowId, error: Option<BridgeError>) {
        let mut state = self.lock();
        match error {
            Some(e) => state.faults.reads.insert(id, e),
            None => state.faults.reads.remove(&id),
        };
    }

    /// Fail window enumeration until cleared with `None`.
    pub fn fail_enumeration(&self, error: Option<BridgeError>) {
        self.lock().faults.enumerate = error;
    }

    /// Fail screen geometry reads until cleared with `None`.
    pub fn fail_screen(&self, error: Option<BridgeError>) {
        self.lock().faults.screen = error;
    }

    // -- Latency injection --

    pub fn set_enumerate_latency(&self, latency: Duration) {
        self.lock().latency.enumerate = latency;
    }

    pub fn set_read_latency(&self, id: WindowId, latency: Duration) {
        self.lock().latency.reads.insert(id, latency);
    }

    pub fn set_write_latency(&self, id: WindowId, latency: Duration) {
        self.lock().latency.writes.insert(id, latency);
    }

    // -- Call log --

    pub fn calls(&self) -> Vec<BridgeCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Number of `set_bounds` and `set_z_index` calls received.
    pub fn write_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, BridgeCall::SetBounds(..) | BridgeCall::SetZIndex(..)))
            .count()
    }

    /// `set_bounds` calls received for `id`, in order.
    pub fn bounds_writes(&self, id: WindowId) -> Vec<Rect> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                BridgeCall::SetBounds(wid, rect) if *wid == id => Some(*rect),
                _ => None,
            })
            .collect()
    }

    // -- Internals --

    fn record(&self, call: BridgeCall) {
        self.lock().calls.push(call);
    }

    fn write_fault(&self, id: WindowId) -> Option<BridgeError> {
        let mut state = self.lock();
        if let Some(queued) = state.faults.queued_writes.get_mut(&id) {
            if let Some(e) = queued.pop_front() {
                return Some(e);
            }
        }
        state.faults.sticky_writes.get(&id).cloned()
    }

    fn write_latency(&self, id: WindowId) -> Duration {
        self.lock()
            .latency
            .writes
            .get(&id)
            .copied()
            .unwrap_or_default()
    }

    fn publish(&self, event: WindowEvent) {
        let subscribers: Vec<Arc<WindowCallback>> = match self.subscribers.lock() {
            Ok(subs) => subs.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            Err(_) => return,
        };
        for callback in subscribers {
            callback(event.clone());
        }
    }
}

fn renumber(windows: &mut [WindowInfo]) {
    for (rank, window) in windows.iter_mut().enumerate() {
        window.z_index = rank as u32;
    }
}

fn sleep(latency: Duration) {
    if !latency.is_zero() {
        std::thread::sleep(latency);
    }
}

impl AutomationBridge for MemoryBridge {
    fn window_ids(&self) -> Result<Vec<WindowId>> {
        self.record(BridgeCall::WindowIds);
        let latency = self.lock().latency.enumerate;
        sleep(latency);

        let state = self.lock();
        if let Some(e) = &state.faults.enumerate {
            return Err(e.clone());
        }
        Ok(state.windows.iter().map(|w| w.id).collect())
    }

    fn window_info(&self, id: WindowId) -> Result<WindowInfo> {
        self.record(BridgeCall::WindowInfo(id));
        let latency = self.lock().latency.reads.get(&id).copied().unwrap_or_default();
        sleep(latency);

        let state = self.lock();
        if let Some(e) = state.faults.reads.get(&id) {
            return Err(e.clone());
        }
        state
            .windows
            .iter()
            .find(|w| w.id == id)
            .cloned()
            .ok_or(BridgeError::WindowGone(id))
    }

    fn set_bounds(&self, id: WindowId, bounds: Rect) -> Result<()> {
        self.record(BridgeCall::SetBounds(id, bounds));
        sleep(self.write_latency(id));
        if let Some(e) = self.write_fault(id) {
            return Err(e);
        }

        let applied = {
            let mut state = self.lock();
            let window = state
                .windows
                .iter_mut()
                .find(|w| w.id == id)
                .ok_or(BridgeError::WindowGone(id))?;
            // Fixed-size windows only move.
            window.bounds = if window.resizable {
                bounds
            } else {
                Rect::new(bounds.x, bounds.y, window.bounds.width, window.bounds.height)
            };
            window.bounds
        };
        self.publish(WindowEvent::Moved(id, applied));
        Ok(())
    }

    fn set_z_index(&self, id: WindowId, rank: u32) -> Result<()> {
        self.record(BridgeCall::SetZIndex(id, rank));
        sleep(self.write_latency(id));
        if let Some(e) = self.write_fault(id) {
            return Err(e);
        }

        let mut state = self.lock();
        let from = state
            .windows
            .iter()
            .position(|w| w.id == id)
            .ok_or(BridgeError::WindowGone(id))?;
        let window = state.windows.remove(from);
        let to = (rank as usize).min(state.windows.len());
        state.windows.insert(to, window);
        renumber(&mut state.windows);
        Ok(())
    }

    fn screen_geometry(&self) -> Result<Rect> {
        self.record(BridgeCall::ScreenGeometry);
        let state = self.lock();
        match &state.faults.screen {
            Some(e) => Err(e.clone()),
            None => Ok(state.screen),
        }
    }

    fn watch_windows(&self, callback: WindowCallback) -> Result<WatchHandle> {
        let id = {
            let mut next = self.next_subscriber.lock().unwrap_or_else(|e| e.into_inner());
            *next += 1;
            *next
        };
        self.subscribers
            .lock()
            .map_err(|_| BridgeError::Unreachable("subscriber registry poisoned".into()))?
            .push((id, Arc::new(callback)));
        Ok(WatchHandle::new(Subscription {
            id,
            subscribers: Arc::downgrade(&self.subscribers),
        }))
    }
}
