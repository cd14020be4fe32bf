//! Remote writes derived from the gap between a snapshot and a target.

use std::time::Instant;

use spatial_bridge::AutomationBridge;
use spatial_common::types::{Rect, WindowId};

use crate::planner::TargetEntry;
use crate::snapshot::WindowHandle;

/// What a single remote write does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpKind {
    Move(Rect),
    Resize(Rect),
    /// Move and resize in one write.
    SetBounds(Rect),
    /// Bring to the front.
    Raise,
    /// Move to a front-to-back rank.
    Reorder(u32),
}

impl OpKind {
    pub fn label(&self) -> &'static str {
        match self {
            OpKind::Move(_) => "move",
            OpKind::Resize(_) => "resize",
            OpKind::SetBounds(_) => "set_bounds",
            OpKind::Raise => "raise",
            OpKind::Reorder(_) => "reorder",
        }
    }

    /// Issue this write through `bridge`.
    pub(crate) fn apply(
        self,
        bridge: &dyn AutomationBridge,
        id: WindowId,
    ) -> spatial_bridge::Result<()> {
        match self {
            OpKind::Move(bounds) | OpKind::Resize(bounds) | OpKind::SetBounds(bounds) => {
                bridge.set_bounds(id, bounds)
            }
            OpKind::Raise => bridge.set_z_index(id, 0),
            OpKind::Reorder(rank) => bridge.set_z_index(id, rank),
        }
    }
}

/// One write waiting to be issued.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOperation {
    pub window_id: WindowId,
    pub kind: OpKind,
    /// Failed attempts so far, counting earlier cycles.
    pub attempt: u32,
    /// Retries for this write may not be scheduled past this instant.
    pub deadline: Instant,
}

/// Writes needed to bring `current` to `entry`, already coalesced.
///
/// Empty when the window is within `epsilon` of its target bounds and
/// already at the desired z-index.
pub fn plan_ops(
    current: &WindowHandle,
    entry: &TargetEntry,
    epsilon: f64,
    attempt: u32,
    deadline: Instant,
) -> Vec<PendingOperation> {
    let mut kinds = Vec::new();
    if current.bounds.max_edge_delta(&entry.bounds) > epsilon {
        if !current.bounds.same_origin(&entry.bounds) {
            kinds.push(OpKind::Move(entry.bounds));
        }
        if !current.bounds.same_size(&entry.bounds) {
            kinds.push(OpKind::Resize(entry.bounds));
        }
    }
    match entry.z_index {
        Some(z) if z != current.z_index && z == 0 => kinds.push(OpKind::Raise),
        Some(z) if z != current.z_index => kinds.push(OpKind::Reorder(z)),
        _ => {}
    }

    coalesce(kinds)
        .into_iter()
        .map(|kind| PendingOperation {
            window_id: current.id,
            kind,
            attempt,
            deadline,
        })
        .collect()
}

/// Merge a move and a resize into one `SetBounds`; bounds writes go
/// before z-order writes.
pub fn coalesce(kinds: Vec<OpKind>) -> Vec<OpKind> {
    let mut bounds: Option<OpKind> = None;
    let mut order = Vec::new();
    for kind in kinds {
        bounds = match (bounds, kind) {
            (None, OpKind::Move(_) | OpKind::Resize(_) | OpKind::SetBounds(_)) => Some(kind),
            (Some(_), OpKind::Move(r) | OpKind::Resize(r) | OpKind::SetBounds(r)) => {
                Some(OpKind::SetBounds(r))
            }
            (current, other) => {
                order.push(other);
                current
            }
        };
    }
    bounds.into_iter().chain(order).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(bounds: Rect, z_index: Option<u32>) -> TargetEntry {
        TargetEntry {
            bounds,
            z_index,
            cell: Some(0),
        }
    }

    fn kinds(ops: &[PendingOperation]) -> Vec<OpKind> {
        ops.iter().map(|op| op.kind).collect()
    }

    #[test]
    fn within_epsilon_needs_nothing() {
        let current = WindowHandle::new(WindowId(1), Rect::new(0.0, 0.0, 600.0, 400.0), 0);
        let target = entry(Rect::new(1.5, 0.0, 601.0, 398.0), None);
        assert!(plan_ops(&current, &target, 2.0, 0, Instant::now()).is_empty());
    }

    #[test]
    fn move_and_resize_merge() {
        let current = WindowHandle::new(WindowId(1), Rect::new(50.0, 50.0, 300.0, 300.0), 0);
        let goal = Rect::new(0.0, 0.0, 600.0, 400.0);
        let ops = plan_ops(&current, &entry(goal, None), 2.0, 0, Instant::now());
        assert_eq!(kinds(&ops), vec![OpKind::SetBounds(goal)]);
    }

    #[test]
    fn move_only_stays_a_move() {
        let current = WindowHandle::new(WindowId(1), Rect::new(50.0, 50.0, 600.0, 400.0), 0);
        let goal = Rect::new(0.0, 0.0, 600.0, 400.0);
        let ops = plan_ops(&current, &entry(goal, None), 2.0, 0, Instant::now());
        assert_eq!(kinds(&ops), vec![OpKind::Move(goal)]);
    }

    #[test]
    fn z_change_follows_bounds() {
        let current = WindowHandle::new(WindowId(1), Rect::new(50.0, 50.0, 300.0, 300.0), 3);
        let goal = Rect::new(0.0, 0.0, 600.0, 400.0);
        let ops = plan_ops(&current, &entry(goal, Some(0)), 2.0, 0, Instant::now());
        assert_eq!(kinds(&ops), vec![OpKind::SetBounds(goal), OpKind::Raise]);

        let ops = plan_ops(&current, &entry(goal, Some(1)), 2.0, 0, Instant::now());
        assert_eq!(kinds(&ops), vec![OpKind::SetBounds(goal), OpKind::Reorder(1)]);
    }

    #[test]
    fn matching_z_needs_no_reorder() {
        let bounds = Rect::new(0.0, 0.0, 600.0, 400.0);
        let current = WindowHandle::new(WindowId(1), bounds, 2);
        assert!(plan_ops(&current, &entry(bounds, Some(2)), 2.0, 0, Instant::now()).is_empty());
    }

    #[test]
    fn coalesce_keeps_bounds_first() {
        let r = Rect::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(
            coalesce(vec![OpKind::Raise, OpKind::Move(r), OpKind::Resize(r)]),
            vec![OpKind::SetBounds(r), OpKind::Raise]
        );
    }

    #[test]
    fn ops_carry_attempt_and_deadline() {
        let current = WindowHandle::new(WindowId(9), Rect::new(50.0, 50.0, 300.0, 300.0), 0);
        let deadline = Instant::now();
        let ops = plan_ops(
            &current,
            &entry(Rect::new(0.0, 0.0, 10.0, 10.0), None),
            2.0,
            3,
            deadline,
        );
        assert_eq!(ops[0].window_id, WindowId(9));
        assert_eq!(ops[0].attempt, 3);
        assert_eq!(ops[0].deadline, deadline);
    }
}
