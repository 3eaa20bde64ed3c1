use std::collections::HashSet;

use log::{debug, trace};
use winit::keyboard::KeyCode;

use crate::game::state::{Shape, SharedState};

/// Key, shape moved, and the step applied per tick while held.
pub const MOVEMENT_BINDINGS: &[(KeyCode, Shape, i32, i32)] = &[
    // ESDF moves the opaque ring
    (KeyCode::KeyE, Shape::Ring2, 0, -1),
    (KeyCode::KeyS, Shape::Ring2, -1, 0),
    (KeyCode::KeyD, Shape::Ring2, 0, 1),
    (KeyCode::KeyF, Shape::Ring2, 1, 0),
    // IJKL moves the translucent ring
    (KeyCode::KeyI, Shape::Ring1, 0, -1),
    (KeyCode::KeyJ, Shape::Ring1, -1, 0),
    (KeyCode::KeyK, Shape::Ring1, 0, 1),
    (KeyCode::KeyL, Shape::Ring1, 1, 0),
    // Arrows move the dot
    (KeyCode::ArrowUp, Shape::Dot, 0, -1),
    (KeyCode::ArrowLeft, Shape::Dot, -1, 0),
    (KeyCode::ArrowDown, Shape::Dot, 0, 1),
    (KeyCode::ArrowRight, Shape::Dot, 1, 0),
];

/// Tracks which keys are currently held.
#[derive(Default)]
pub struct InputHandler {
    pressed_keys: HashSet<KeyCode>,
}

impl InputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_keyboard_input_event(&mut self, keycode: KeyCode, pressed: bool) {
        if pressed {
            self.pressed_keys.insert(keycode);
        } else {
            self.pressed_keys.remove(&keycode);
        }
    }

    /// Drops held keys when focus is lost; their release events go elsewhere.
    pub fn handle_window_focus(&mut self, focused: bool) {
        if !focused && !self.pressed_keys.is_empty() {
            debug!("Window unfocused, releasing {} held keys", self.pressed_keys.len());
            self.pressed_keys.clear();
        }
    }

    pub fn is_pressed(&self, keycode: KeyCode) -> bool {
        self.pressed_keys.contains(&keycode)
    }

    /// Moves each shape one unit per held key bound to it.
    pub fn apply_movement(&self, state: &SharedState) {
        for &(key, shape, dx, dy) in MOVEMENT_BINDINGS {
            if self.is_pressed(key) {
                state.position(shape).nudge(dx, dy);
                trace!("{:?} moved to {:?}", shape, state.position(shape).load());
            }
        }
    }
}
