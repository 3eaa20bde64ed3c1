//! Engine module containing graphics, input, timing and window management.

pub mod graphics;
pub mod input;
pub mod time;
pub mod window;

// Re-export commonly used types
pub use graphics::{canvas::Canvas, renderer::WgpuCanvas, software::SoftwareCanvas, sprite::Sprite};
