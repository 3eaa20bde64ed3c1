//! Input handling module
//! This module contains input events and held-key tracking for keyboard and window events.

pub mod events;
pub mod handler;

pub use events::{EventSource, InputEvent};
pub use handler::InputHandler;
