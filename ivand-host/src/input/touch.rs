//! Touch-gesture decoding.
//!
//! Three on-screen zones: a directional pad and two action buttons. The
//! directional pad claims the first touch that starts inside its zone and
//! ignores further starts until that touch ends; direction comes from the
//! drag's displacement from its origin, one axis at a time. The action zones
//! are momentary and each pairs its own start/end by touch identifier.
//!
//! Unlike keyboard and gamepad bits, touch bits are never persisted: the
//! aggregator recomputes them from this state on every poll.

use crate::abi::{ButtonMask, buttons};

/// Displacement (in logical pixels) a drag must exceed, strictly, to
/// register a direction. At or below the threshold the axis is neutral.
pub const DRAG_THRESHOLD: i32 = 10;

/// Platform-assigned touch identifier. Stable for the lifetime of one touch.
pub type TouchId = u64;

/// Axis-aligned zone rectangle in logical pixels.
#[derive(Copy, Clone, Debug)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.w && y >= self.y && y < self.y + self.h
    }
}

/// Where the three touch zones sit on screen. Sizing/styling of the controls
/// is a presentation concern; the decoder only needs the hit rectangles.
#[derive(Copy, Clone, Debug)]
pub struct TouchLayout {
    pub dpad: Rect,
    pub action_a: Rect,
    pub action_b: Rect,
}

/// The directional control's claimed drag point.
#[derive(Copy, Clone, Debug)]
struct Drag {
    id: TouchId,
    origin: (i32, i32),
    at: (i32, i32),
}

/// All touch-source state.
#[derive(Debug)]
pub struct TouchState {
    layout: TouchLayout,
    drag: Option<Drag>,
    action_a: Option<TouchId>,
    action_b: Option<TouchId>,
}

impl TouchState {
    pub fn new(layout: TouchLayout) -> Self {
        Self {
            layout,
            drag: None,
            action_a: None,
            action_b: None,
        }
    }

    pub fn start(&mut self, id: TouchId, x: i32, y: i32) {
        if self.layout.dpad.contains(x, y) {
            // At most one live drag; later touches in the zone are ignored.
            if self.drag.is_none() {
                self.drag = Some(Drag {
                    id,
                    origin: (x, y),
                    at: (x, y),
                });
            }
        } else if self.layout.action_a.contains(x, y) {
            if self.action_a.is_none() {
                self.action_a = Some(id);
            }
        } else if self.layout.action_b.contains(x, y) && self.action_b.is_none() {
            self.action_b = Some(id);
        }
    }

    pub fn moved(&mut self, id: TouchId, x: i32, y: i32) {
        if let Some(drag) = &mut self.drag
            && drag.id == id
        {
            drag.at = (x, y);
        }
    }

    /// End or cancellation: releases the drag claim (both axes back to
    /// neutral) and clears a matching action flag.
    pub fn end(&mut self, id: TouchId) {
        if self.drag.is_some_and(|d| d.id == id) {
            self.drag = None;
        }
        if self.action_a == Some(id) {
            self.action_a = None;
        }
        if self.action_b == Some(id) {
            self.action_b = None;
        }
    }

    pub fn cancel(&mut self, id: TouchId) {
        self.end(id);
    }

    /// Recompute the touch-derived bits from scratch.
    pub fn mask(&self) -> ButtonMask {
        let mut mask = 0;
        if let Some(drag) = &self.drag {
            let dx = drag.at.0 - drag.origin.0;
            let dy = drag.at.1 - drag.origin.1;
            if dx < -DRAG_THRESHOLD {
                mask |= buttons::LEFT;
            } else if dx > DRAG_THRESHOLD {
                mask |= buttons::RIGHT;
            }
            if dy < -DRAG_THRESHOLD {
                mask |= buttons::UP;
            } else if dy > DRAG_THRESHOLD {
                mask |= buttons::DOWN;
            }
        }
        if self.action_a.is_some() {
            mask |= buttons::ACTION_A;
        }
        if self.action_b.is_some() {
            mask |= buttons::ACTION_B;
        }
        mask
    }
}
