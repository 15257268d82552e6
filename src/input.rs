//! Input model: modifier keys, selection modes, the gesture state machine and
//! the per-frame pointer slot.
//!
//! `InputState` is the gesture tracked between pointer-down and pointer-up.
//! `FrameSlot` collapses the pointer events that arrive between two animation
//! frames into one pending point.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::doc::NodeId;
use crate::geometry::{Point, Rect};

/// Keyboard modifier keys held during an event.
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Selection mode implied by these modifiers: shift adds, ctrl/meta toggles.
    #[must_use]
    pub fn select_mode(self) -> SelectMode {
        if self.ctrl || self.meta {
            SelectMode::Toggle
        } else if self.shift {
            SelectMode::Add
        } else {
            SelectMode::Replace
        }
    }
}

/// How a click combines with the current multi-selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectMode {
    /// Select only the clicked node.
    #[default]
    Replace,
    /// Add the clicked node, keeping the rest.
    Add,
    /// Flip the clicked node's membership.
    Toggle,
}

/// Active gesture.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InputState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// One or more nodes are being dragged.
    DraggingNodes {
        /// Node under the pointer at drag start.
        primary: NodeId,
        /// World-space pointer position at drag start.
        grab_world: Point,
        /// Every dragged node with its position at drag start.
        initial: Vec<(NodeId, Point)>,
    },
    /// A selection rectangle is being drawn.
    Marquee {
        start: Point,
        current: Point,
    },
    /// A connector is being drawn from `source`.
    DrawingConnector {
        source: NodeId,
    },
}

impl InputState {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// The marquee rectangle, if a marquee gesture is active.
    #[must_use]
    pub fn marquee_rect(&self) -> Option<Rect> {
        match self {
            Self::Marquee { start, current } => Some(Rect::from_corners(*start, *current)),
            _ => None,
        }
    }
}

/// At most one pending pointer position per animation frame.
///
/// The first [`FrameSlot::offer`] between frames arms the slot (the caller
/// should request a frame). Later offers overwrite the point without
/// re-arming.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameSlot {
    pending: Option<Point>,
    armed: bool,
}

impl FrameSlot {
    /// Store `point` as the latest input. Returns `true` when this call armed
    /// the slot.
    pub fn offer(&mut self, point: Point) -> bool {
        self.pending = Some(point);
        if self.armed {
            false
        } else {
            self.armed = true;
            true
        }
    }

    /// Take the pending point and disarm.
    pub fn take(&mut self) -> Option<Point> {
        self.armed = false;
        self.pending.take()
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    #[must_use]
    pub fn pending(&self) -> Option<Point> {
        self.pending
    }
}
