//! Pointer-driven selection, move and resize
//!
//! A press on the selected object's corner handle starts a resize; a press
//! anywhere else on a selectable object selects it and starts a move; a press
//! on empty space clears the selection. All coordinates are surface pixels.

use crate::annotations::{Bounds, Interactive, ObjectId};
use crate::surface::OverlaySurface;

/// Side length of the square resize handle, in pixels.
pub const HANDLE_SIZE: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Move {
        id: ObjectId,
        grab_dx: f32,
        grab_dy: f32,
    },
    Resize {
        id: ObjectId,
        origin: Bounds,
        start_x: f32,
        start_y: f32,
    },
}

/// Tracks an in-progress pointer gesture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointerTracker {
    gesture: Option<Gesture>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Returns the object now selected, if any.
    pub fn pointer_down(&mut self, surface: &mut OverlaySurface, x: f32, y: f32) -> Option<ObjectId> {
        if let Some(selected) = surface.selection() {
            if let Some(bounds) = surface.object(selected).map(|obj| obj.bounds()) {
                if on_handle(&bounds, x, y) {
                    self.gesture = Some(Gesture::Resize {
                        id: selected,
                        origin: bounds,
                        start_x: x,
                        start_y: y,
                    });
                    return Some(selected);
                }
            }
        }

        let hit = surface.hit_test(x, y);
        surface.select(hit);
        self.gesture = hit.and_then(|id| {
            surface.object(id).map(|obj| {
                let bounds = obj.bounds();
                Gesture::Move {
                    id,
                    grab_dx: x - bounds.x,
                    grab_dy: y - bounds.y,
                }
            })
        });
        hit
    }

    /// Apply the active gesture. Returns whether anything changed.
    pub fn pointer_move(&mut self, surface: &mut OverlaySurface, x: f32, y: f32) -> bool {
        match self.gesture {
            Some(Gesture::Move { id, grab_dx, grab_dy }) => match surface.object_mut(id) {
                Some(obj) => {
                    obj.move_to(x - grab_dx, y - grab_dy);
                    true
                }
                None => false,
            },
            Some(Gesture::Resize {
                id,
                origin,
                start_x,
                start_y,
            }) => match surface.object_mut(id) {
                Some(obj) => {
                    obj.resize_to(origin.width + (x - start_x), origin.height + (y - start_y));
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    pub fn pointer_up(&mut self) {
        self.gesture = None;
    }
}

fn on_handle(bounds: &Bounds, x: f32, y: f32) -> bool {
    let half = HANDLE_SIZE / 2.0;
    (x - bounds.right()).abs() <= half && (y - bounds.bottom()).abs() <= half
}
