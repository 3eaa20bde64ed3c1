//! The two loops: fixed-rate updates on the main thread, frames on the render thread.

pub mod render;
pub mod update;

pub use render::{RenderLoop, Scene, ViewportTracker};
pub use update::{Simulation, TickOutcome, TickScheduler, UpdateLoop};
