//! State shared between the update and render threads.

pub mod shared;

pub use shared::{AtomicPosition, Position, Positions, Shape, SharedState};
