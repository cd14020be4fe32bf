//! Desired window geometry produced by a layout policy.

use std::collections::BTreeMap;

use serde::Serialize;
use spatial_common::types::{Rect, WindowId};

/// Rows and columns of a grid layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridDims {
    pub rows: usize,
    pub cols: usize,
}

impl GridDims {
    pub fn cells(&self) -> usize {
        self.rows * self.cols
    }
}

/// Where one window should be.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetEntry {
    pub bounds: Rect,
    /// Desired front-to-back rank; `None` leaves z-order alone.
    pub z_index: Option<u32>,
    /// Grid cell the window was placed in, row-major.
    pub cell: Option<usize>,
}

/// Desired state of every managed window for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutTarget {
    entries: BTreeMap<WindowId, TargetEntry>,
    grid: Option<GridDims>,
}

impl LayoutTarget {
    pub fn new(grid: Option<GridDims>) -> Self {
        Self {
            entries: BTreeMap::new(),
            grid,
        }
    }

    pub fn insert(&mut self, id: WindowId, entry: TargetEntry) {
        self.entries.insert(id, entry);
    }

    pub fn get(&self, id: WindowId) -> Option<&TargetEntry> {
        self.entries.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (WindowId, &TargetEntry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn ids(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn grid(&self) -> Option<GridDims> {
        self.grid
    }

    /// Cell `id` occupied, if the target was computed for `grid`.
    pub fn cell_in(&self, id: WindowId, grid: GridDims) -> Option<usize> {
        if self.grid != Some(grid) {
            return None;
        }
        self.get(id).and_then(|e| e.cell)
    }
}
