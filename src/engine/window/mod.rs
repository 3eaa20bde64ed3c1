//! Window creation and event pumping.

pub mod manager;

pub use manager::{WindowError, WindowManager};
