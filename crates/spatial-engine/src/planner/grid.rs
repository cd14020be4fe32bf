//! Near-square grid that keeps windows in the cells they already hold.

use spatial_common::errors::PlanError;
use spatial_common::types::Rect;
use spatial_config::schema::LayoutConfig;

use super::target::{GridDims, LayoutTarget, TargetEntry};
use super::LayoutPolicy;
use crate::snapshot::{Snapshot, WindowHandle};

/// Smallest grid holding `n` cells whose sides differ by at most one.
/// The longer side follows the longer screen axis.
pub fn grid_dims(n: usize, screen: Rect) -> GridDims {
    if n == 0 {
        return GridDims { rows: 0, cols: 0 };
    }
    let long = (n as f64).sqrt().ceil() as usize;
    let short = n.div_ceil(long);
    if screen.height > screen.width {
        GridDims {
            rows: long,
            cols: short,
        }
    } else {
        GridDims {
            rows: short,
            cols: long,
        }
    }
}

/// Grid layout over the usable screen area.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpatialPolicy {
    pub edge_margin: f64,
    pub gutter: f64,
    pub raise_on_arrange: bool,
    pub manage_floating: bool,
}

impl GridSpatialPolicy {
    pub fn from_config(config: &LayoutConfig) -> Self {
        Self {
            edge_margin: f64::from(config.edge_margin),
            gutter: f64::from(config.gutter),
            raise_on_arrange: config.raise_on_arrange,
            manage_floating: config.manage_floating,
        }
    }

    /// Whether the policy arranges `window` at all.
    pub fn manages(&self, window: &WindowHandle) -> bool {
        window.visible && !window.minimized && (self.manage_floating || !window.floating)
    }

    /// Rectangle of every cell, row-major.
    fn cells(&self, screen: Rect, grid: GridDims) -> Result<Vec<Rect>, PlanError> {
        if screen.is_empty() {
            return Err(PlanError::PolicyMisconfigured(format!(
                "usable screen area is empty: {screen}"
            )));
        }
        let span = |total: f64, count: usize| {
            (total - 2.0 * self.edge_margin - (count as f64 - 1.0) * self.gutter) / count as f64
        };
        let cell_w = span(screen.width, grid.cols);
        let cell_h = span(screen.height, grid.rows);
        if cell_w <= 0.0 || cell_h <= 0.0 {
            return Err(PlanError::PolicyMisconfigured(format!(
                "edge margin {} and gutter {} leave no room for a {}x{} grid on {screen}",
                self.edge_margin, self.gutter, grid.rows, grid.cols
            )));
        }

        let origin_x = screen.x + self.edge_margin;
        let origin_y = screen.y + self.edge_margin;
        Ok((0..grid.cells())
            .map(|cell| {
                let (row, col) = (cell / grid.cols, cell % grid.cols);
                Rect::new(
                    origin_x + col as f64 * (cell_w + self.gutter),
                    origin_y + row as f64 * (cell_h + self.gutter),
                    cell_w,
                    cell_h,
                )
            })
            .collect())
    }
}

impl LayoutPolicy for GridSpatialPolicy {
    fn name(&self) -> &str {
        spatial_config::schema::GRID_SPATIAL_POLICY
    }

    fn plan(
        &self,
        snapshot: &Snapshot,
        previous: Option<&LayoutTarget>,
    ) -> Result<LayoutTarget, PlanError> {
        let managed: Vec<&WindowHandle> = snapshot
            .windows()
            .iter()
            .filter(|w| self.manages(w))
            .collect();
        let grid = grid_dims(managed.len(), snapshot.screen());
        let mut target = LayoutTarget::new(Some(grid));
        if managed.is_empty() {
            return Ok(target);
        }
        let cells = self.cells(snapshot.screen(), grid)?;

        // Keep previous cells first, then fill the lowest free cells in
        // snapshot order.
        let mut taken = vec![false; cells.len()];
        let mut assigned: Vec<Option<usize>> = managed
            .iter()
            .map(|w| {
                let cell = previous.and_then(|p| p.cell_in(w.id, grid))?;
                if cell < taken.len() && !taken[cell] {
                    taken[cell] = true;
                    Some(cell)
                } else {
                    None
                }
            })
            .collect();
        let mut free = (0..cells.len()).filter(|c| !taken[*c]).collect::<Vec<_>>().into_iter();
        for slot in assigned.iter_mut().filter(|s| s.is_none()) {
            *slot = free.next();
        }

        for (rank, (window, cell)) in managed.iter().zip(assigned).enumerate() {
            // rows * cols >= n, so every window has a cell.
            let Some(cell) = cell else { continue };
            let area = cells[cell];
            let bounds = if window.resizable {
                area
            } else {
                area.center_size(window.bounds.width, window.bounds.height)
            };
            target.insert(
                window.id,
                TargetEntry {
                    bounds: bounds.round(),
                    z_index: self.raise_on_arrange.then_some(rank as u32),
                    cell: Some(cell),
                },
            );
        }
        Ok(target)
    }
}
