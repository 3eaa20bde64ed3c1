//! Library entry point for the sprite loop demo.

pub mod engine;
pub mod game;

// Re-export main types for convenience
pub use game::{App, AppConfig};
