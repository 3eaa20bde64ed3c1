//! Positions, window size and the shutdown flag, shared through an `Arc`.
//!
//! Only the update thread writes positions and the window size. Each
//! coordinate is its own relaxed atomic, so the render thread may pair an x
//! from one tick with a y from the next; that shows up as one slightly stale
//! frame and nothing worse.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

use winit::dpi::PhysicalSize;

use crate::game::config::AppConfig;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// The three movable shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Translucent ring, blended last.
    Ring1,
    /// Opaque ring.
    Ring2,
    Dot,
}

pub struct AtomicPosition {
    x: AtomicI32,
    y: AtomicI32,
}

impl AtomicPosition {
    pub fn new(position: Position) -> Self {
        Self {
            x: AtomicI32::new(position.x),
            y: AtomicI32::new(position.y),
        }
    }

    pub fn load(&self) -> Position {
        Position {
            x: self.x.load(Ordering::Relaxed),
            y: self.y.load(Ordering::Relaxed),
        }
    }

    pub fn store(&self, position: Position) {
        self.x.store(position.x, Ordering::Relaxed);
        self.y.store(position.y, Ordering::Relaxed);
    }

    /// Moves by `(dx, dy)`, saturating at the `i32` range. Single writer only.
    pub fn nudge(&self, dx: i32, dy: i32) {
        let current = self.load();
        self.store(Position {
            x: current.x.saturating_add(dx),
            y: current.y.saturating_add(dy),
        });
    }
}

pub struct SharedState {
    ring1: AtomicPosition,
    ring2: AtomicPosition,
    dot: AtomicPosition,
    window_width: AtomicU32,
    window_height: AtomicU32,
    shutdown: AtomicBool,
}

impl SharedState {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            ring1: AtomicPosition::new(config.ring1_start),
            ring2: AtomicPosition::new(config.ring2_start),
            dot: AtomicPosition::new(config.dot_start),
            window_width: AtomicU32::new(config.window_size.width),
            window_height: AtomicU32::new(config.window_size.height),
            shutdown: AtomicBool::new(false),
        }
    }

    pub fn position(&self, shape: Shape) -> &AtomicPosition {
        match shape {
            Shape::Ring1 => &self.ring1,
            Shape::Ring2 => &self.ring2,
            Shape::Dot => &self.dot,
        }
    }

    pub fn snapshot(&self) -> Positions {
        Positions {
            ring1: self.ring1.load(),
            ring2: self.ring2.load(),
            dot: self.dot.load(),
        }
    }

    pub fn window_size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(
            self.window_width.load(Ordering::Relaxed),
            self.window_height.load(Ordering::Relaxed),
        )
    }

    pub fn set_window_size(&self, size: PhysicalSize<u32>) {
        self.window_width.store(size.width, Ordering::Relaxed);
        self.window_height.store(size.height, Ordering::Relaxed);
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

/// Point-in-time copy of all three positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Positions {
    pub ring1: Position,
    pub ring2: Position,
    pub dot: Position,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_configured_positions() {
        let state = SharedState::new(&AppConfig::default());
        let positions = state.snapshot();
        assert_eq!(positions.ring1, Position::new(175, 145));
        assert_eq!(positions.ring2, Position::new(130, 130));
        assert_eq!(positions.dot, Position::new(180, 180));
        assert_eq!(state.window_size(), PhysicalSize::new(400, 400));
        assert!(!state.shutdown_requested());
    }

    #[test]
    fn nudge_saturates_instead_of_wrapping() {
        let position = AtomicPosition::new(Position::new(i32::MAX, i32::MIN));
        position.nudge(1, -1);
        assert_eq!(position.load(), Position::new(i32::MAX, i32::MIN));
    }

    #[test]
    fn shutdown_is_visible_across_threads() {
        let state = std::sync::Arc::new(SharedState::new(&AppConfig::default()));
        let remote = std::sync::Arc::clone(&state);
        std::thread::spawn(move || remote.request_shutdown()).join().unwrap();
        assert!(state.shutdown_requested());
    }
}
