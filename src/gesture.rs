//! The interactive gesture lifecycle: Idle → Previewing(baseline) → Idle.
//!
//! A gesture's preview is always recomputed against the baseline captured at
//! begin, never against the prior frame, so intermediate updates cannot
//! accumulate drift. Scratch slots are disjoint per gesture kind and carried
//! inside the state transition, so two kinds are never simultaneously active
//! and gesture end always clears everything.

use glam::Vec2;

use crate::document::Document;
use crate::path::HandleSide;

/// Which gradient handle a gradient-handle gesture is dragging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientEnd {
    Start,
    End,
}

/// Gesture-specific scratch state captured at begin.
#[derive(Debug, Clone)]
pub enum GestureScratch {
    /// Translating a set of shapes from a pointer origin.
    Drag { ids: Vec<String>, origin: Vec2 },
    /// Resizing one shape; the baseline holds its original dimensions.
    Resize { id: String, origin: Vec2 },
    /// Rotating one shape about its center.
    Rotate { id: String, origin: Vec2 },
    /// Dragging one bezier handle of one path point.
    PathHandle {
        id: String,
        index: usize,
        side: HandleSide,
        break_symmetry: bool,
    },
    /// Dragging one anchor of one path point.
    PathAnchor { id: String, index: usize },
    /// Dragging a gradient endpoint of one style slot.
    GradientHandle {
        id: String,
        fill_index: usize,
        end: GradientEnd,
    },
}

/// The engine's single gesture slot.
#[derive(Debug, Clone, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Previewing {
        baseline: Document,
        scratch: GestureScratch,
    },
}

impl GestureState {
    pub fn is_active(&self) -> bool {
        matches!(self, GestureState::Previewing { .. })
    }

    /// Begins a gesture, capturing the baseline. Returns false if another
    /// gesture is already active.
    pub fn begin(&mut self, baseline: Document, scratch: GestureScratch) -> bool {
        if self.is_active() {
            return false;
        }
        *self = GestureState::Previewing { baseline, scratch };
        true
    }

    /// Ends the gesture, yielding the baseline and scratch for the caller
    /// to diff against or restore.
    pub fn take(&mut self) -> Option<(Document, GestureScratch)> {
        match std::mem::take(self) {
            GestureState::Idle => None,
            GestureState::Previewing { baseline, scratch } => Some((baseline, scratch)),
        }
    }

    pub fn baseline(&self) -> Option<&Document> {
        match self {
            GestureState::Idle => None,
            GestureState::Previewing { baseline, .. } => Some(baseline),
        }
    }

    pub fn scratch(&self) -> Option<&GestureScratch> {
        match self {
            GestureState::Idle => None,
            GestureState::Previewing { scratch, .. } => Some(scratch),
        }
    }
}
