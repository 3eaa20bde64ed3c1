//! Demo-specific state, loops and wiring.

pub mod app;
pub mod config;
pub mod loops;
pub mod state;

// Re-export commonly used types
pub use app::{run_loops, App, AppError, StartupError};
pub use config::{AppConfig, DisplayConfig};
pub use state::{Position, Shape, SharedState};
