use crate::tree::NodeId;

/// Vertical extent of a row as measured on screen (or in content space, as
/// long as both rects share the same space).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowRect {
    pub top: f32,
    pub height: f32,
}

impl RowRect {
    pub fn new(top: f32, height: f32) -> Self {
        Self { top, height }
    }

    #[inline]
    pub fn center(&self) -> f32 {
        self.top + self.height / 2.0
    }
}

/// The classified meaning of a drag-release gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropIntent {
    ReorderAbove,
    ReorderBelow,
    Group,
}

/// Fractions of the target row height that bound the reorder zones. The band
/// between them classifies as [`DropIntent::Group`].
///
/// The defaults mirror the usual split (top quarter, bottom quarter, wide
/// middle), but callers can narrow the group band or collapse it entirely
/// for reorder-only surfaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropZones {
    pub above: f32,
    pub below: f32,
}

impl Default for DropZones {
    fn default() -> Self {
        Self {
            above: 0.25,
            below: 0.75,
        }
    }
}

impl DropZones {
    /// No group band; every drop is a reorder.
    pub fn reorder_only() -> Self {
        Self {
            above: 0.5,
            below: 0.5,
        }
    }
}

/// Classify where the dragged row sits relative to the target row.
///
/// Runs on every pointer move, so this is pure arithmetic over rectangles
/// measured elsewhere; it never touches the tree. Missing or degenerate
/// geometry falls back to [`DropIntent::ReorderBelow`].
pub fn classify_drop(
    dragged: Option<RowRect>,
    target: Option<RowRect>,
    zones: DropZones,
) -> DropIntent {
    let (Some(dragged), Some(target)) = (dragged, target) else {
        return DropIntent::ReorderBelow;
    };
    let center = dragged.center();
    if !center.is_finite() || !target.top.is_finite() || !(target.height > 0.0) {
        return DropIntent::ReorderBelow;
    }

    // A fraction outside [0, 1] means the dragged center is past an edge;
    // the threshold comparisons already resolve that to the nearest zone.
    let fraction = (center - target.top) / target.height;
    if fraction < zones.above {
        DropIntent::ReorderAbove
    } else if fraction > zones.below {
        DropIntent::ReorderBelow
    } else {
        DropIntent::Group
    }
}

/// Per-interaction drag state. Created at drag start, updated on every move,
/// discarded unconditionally at drag end or cancellation. Drag moves only
/// ever update this feedback state; the forest is untouched until drop.
#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    pub dragged_id: NodeId,
    pub over_id: Option<NodeId>,
    pub intent: Option<DropIntent>,
}

impl DragState {
    pub fn new(dragged_id: impl Into<NodeId>) -> Self {
        Self {
            dragged_id: dragged_id.into(),
            over_id: None,
            intent: None,
        }
    }

    pub fn drag_over(&mut self, over_id: impl Into<NodeId>, intent: DropIntent) {
        let over_id = over_id.into();
        if over_id == self.dragged_id {
            self.leave();
            return;
        }
        self.over_id = Some(over_id);
        self.intent = Some(intent);
    }

    /// Pointer left every candidate target.
    pub fn leave(&mut self) {
        self.over_id = None;
        self.intent = None;
    }

    pub fn is_over(&self, id: &str) -> bool {
        self.over_id.as_deref() == Some(id)
    }
}
