//! Application configuration and display detection.

use std::path::PathBuf;

use log::debug;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::engine::graphics::canvas::ClearColor;
use crate::game::state::Position;

pub const WINDOW_TITLE: &str = "Simple 2D Example";
pub const INITIAL_WINDOW_SIZE: PhysicalSize<u32> = PhysicalSize::new(400, 400);
pub const UPDATES_PER_SECOND: u32 = 48;
pub const DEFAULT_REFRESH_RATE: u32 = 60;
pub const RESCALE_ON_RESIZE: bool = true;
pub const DOT_IMAGE: &str = "dot.png";
pub const RING_IMAGE: &str = "ring.png";
/// Frames with less than this many milliseconds of budget left do not sleep.
pub const MIN_FRAME_SLEEP_MS: i64 = 2;

/// Everything the app needs to start, fixed after startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub window_size: PhysicalSize<u32>,
    pub updates_per_second: u32,
    pub default_refresh_rate: u32,
    /// Stretch the fixed projection over the whole window when it is resized.
    pub rescale_on_resize: bool,
    pub dot_image: PathBuf,
    pub ring_image: PathBuf,
    pub ring1_start: Position,
    pub ring2_start: Position,
    pub dot_start: Position,
    pub clear_color: ClearColor,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: WINDOW_TITLE.to_string(),
            window_size: INITIAL_WINDOW_SIZE,
            updates_per_second: UPDATES_PER_SECOND,
            default_refresh_rate: DEFAULT_REFRESH_RATE,
            rescale_on_resize: RESCALE_ON_RESIZE,
            dot_image: PathBuf::from(DOT_IMAGE),
            ring_image: PathBuf::from(RING_IMAGE),
            ring1_start: Position::new(175, 145),
            ring2_start: Position::new(130, 130),
            dot_start: Position::new(180, 180),
            clear_color: ClearColor::NEUTRAL_GRAY,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayConfig {
    pub refresh_rate: u32,
}

impl DisplayConfig {
    /// Uses `refresh_rate` unless it is missing or zero.
    pub fn from_refresh_rate(refresh_rate: Option<u32>, fallback: u32) -> Self {
        let refresh_rate = match refresh_rate {
            Some(rate) if rate > 0 => rate,
            _ => {
                debug!("Refresh rate unavailable, using {fallback}Hz");
                fallback
            }
        };
        Self { refresh_rate }
    }

    /// Reads the refresh rate of the monitor the window is on.
    pub fn detect(window: &Window, fallback: u32) -> Self {
        let detected = window
            .current_monitor()
            .and_then(|monitor| monitor.refresh_rate_millihertz())
            .map(|millihertz| (millihertz + 500) / 1000);
        Self::from_refresh_rate(detected, fallback)
    }

    /// Frame budget used to rate-limit rendering when vsync is unavailable.
    pub fn min_ms_per_frame(&self) -> u64 {
        1000 / self.refresh_rate.max(1) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_rate_falls_back_when_missing_or_zero() {
        assert_eq!(DisplayConfig::from_refresh_rate(None, 60).refresh_rate, 60);
        assert_eq!(DisplayConfig::from_refresh_rate(Some(0), 60).refresh_rate, 60);
        assert_eq!(DisplayConfig::from_refresh_rate(Some(144), 60).refresh_rate, 144);
    }

    #[test]
    fn frame_budget_uses_integer_milliseconds() {
        assert_eq!(DisplayConfig { refresh_rate: 60 }.min_ms_per_frame(), 16);
        assert_eq!(DisplayConfig { refresh_rate: 144 }.min_ms_per_frame(), 6);
    }

    #[test]
    fn defaults_match_the_demo_layout() {
        let config = AppConfig::default();
        assert_eq!(config.title, "Simple 2D Example");
        assert_eq!(config.window_size, PhysicalSize::new(400, 400));
        assert_eq!(config.updates_per_second, 48);
        assert_eq!(config.dot_start, Position::new(180, 180));
    }
}
