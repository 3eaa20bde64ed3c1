//! Startup and shutdown coordination for the two loops.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, info};
use thiserror::Error;

use crate::engine::graphics::canvas::{Canvas, RenderError};
use crate::engine::graphics::renderer::WgpuCanvas;
use crate::engine::graphics::sprite::LoadError;
use crate::engine::input::EventSource;
use crate::engine::time::SystemClock;
use crate::engine::window::{WindowError, WindowManager};
use crate::game::config::{AppConfig, DisplayConfig};
use crate::game::loops::{RenderLoop, Scene, Simulation, UpdateLoop};
use crate::game::state::SharedState;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Window(#[from] WindowError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error("failed to spawn render thread: {0}")]
    SpawnRenderThread(#[source] std::io::Error),

    #[error("render thread exited before reporting startup")]
    RenderThreadLost,

    #[error("render thread panicked")]
    RenderThreadPanicked,
}

/// Failures the render thread reports before its first frame.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

pub struct App {
    config: AppConfig,
    window_manager: WindowManager,
    state: Arc<SharedState>,
    display: DisplayConfig,
}

impl App {
    /// Opens the window and detects the display refresh rate.
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        let window_manager = WindowManager::new(&config.title, config.window_size)?;
        let window = window_manager.window();
        let display = DisplayConfig::detect(&window, config.default_refresh_rate);
        info!("Display refresh rate: {}Hz", display.refresh_rate);

        let state = Arc::new(SharedState::new(&config));
        state.set_window_size(window_manager.get_size());

        Ok(Self {
            config,
            window_manager,
            state,
            display,
        })
    }

    /// Runs until the window is closed or rendering fails.
    pub fn run(mut self) -> Result<(), AppError> {
        let window = self.window_manager.window();
        let logical_size = self.config.window_size;
        let ticks = run_loops(
            &self.config,
            Arc::clone(&self.state),
            self.display,
            move || WgpuCanvas::new(window, logical_size),
            &mut self.window_manager,
        )?;
        info!("Update loop stopped after {ticks} ticks");
        // The window and event loop close when `self` drops.
        info!("Shutdown complete");
        Ok(())
    }
}

/// Starts the render thread on a canvas from `create_canvas`, runs the update
/// loop on the calling thread once rendering is ready, then raises shutdown
/// and joins the render thread. Returns the number of update ticks.
///
/// A startup failure on the render thread is returned without running any
/// update tick.
pub fn run_loops<C, F>(
    config: &AppConfig,
    state: Arc<SharedState>,
    display: DisplayConfig,
    create_canvas: F,
    events: &mut impl EventSource,
) -> Result<u64, AppError>
where
    C: Canvas,
    F: FnOnce() -> Result<C, RenderError> + Send + 'static,
{
    let (ready_tx, ready_rx) = bounded(1);
    let render_thread = spawn_render_thread(
        create_canvas,
        Arc::clone(&state),
        display,
        config.clone(),
        ready_tx,
    )?;

    if let Err(e) = wait_until_ready(&ready_rx) {
        state.request_shutdown();
        let _ = render_thread.join();
        return Err(e);
    }

    let mut simulation = Simulation::new(Arc::clone(&state));
    let ticks = UpdateLoop::new(SystemClock::new(), config.updates_per_second)
        .run(|| simulation.update(&mut *events));

    state.request_shutdown();
    let rendered = render_thread.join().map_err(|_| {
        error!("Render thread panicked");
        AppError::RenderThreadPanicked
    })?;
    let frames = rendered?;
    debug!("Render thread joined after {frames} frames");
    Ok(ticks)
}

fn wait_until_ready(ready: &Receiver<Result<(), StartupError>>) -> Result<(), AppError> {
    let started = ready.recv().map_err(|_| AppError::RenderThreadLost)?;
    Ok(started?)
}

/// Starts the render thread. It reports on `ready` once the canvas and
/// sprites exist, then renders until shutdown.
fn spawn_render_thread<C, F>(
    create_canvas: F,
    state: Arc<SharedState>,
    display: DisplayConfig,
    config: AppConfig,
    ready: Sender<Result<(), StartupError>>,
) -> Result<JoinHandle<Result<u64, RenderError>>, AppError>
where
    C: Canvas,
    F: FnOnce() -> Result<C, RenderError> + Send + 'static,
{
    thread::Builder::new()
        .name("render".to_string())
        .spawn(move || {
            let mut canvas = match create_canvas() {
                Ok(canvas) => canvas,
                Err(e) => {
                    error!("Failed to create canvas: {e}");
                    let _ = ready.send(Err(e.into()));
                    return Ok(0);
                }
            };
            let scene = match Scene::load(&mut canvas, &config.dot_image, &config.ring_image) {
                Ok(scene) => scene,
                Err(e) => {
                    error!("Failed to load sprites: {e}");
                    let _ = ready.send(Err(e.into()));
                    return Ok(0);
                }
            };
            let _ = ready.send(Ok(()));

            RenderLoop::new(canvas, SystemClock::new(), scene, state, display, &config).run()
        })
        .map_err(AppError::SpawnRenderThread)
}

#[cfg(test)]
mod tests {
    use super::*;

    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    use crate::engine::graphics::software::SoftwareCanvas;
    use crate::engine::input::InputEvent;

    /// Asks to quit on the given drain, counting drains.
    struct QuitOnDrain {
        quit_at: u32,
        drained: u32,
    }

    impl QuitOnDrain {
        fn new(quit_at: u32) -> Self {
            Self { quit_at, drained: 0 }
        }
    }

    impl EventSource for QuitOnDrain {
        fn drain(&mut self, out: &mut Vec<InputEvent>) {
            self.drained += 1;
            if self.drained >= self.quit_at {
                out.push(InputEvent::Quit);
            }
        }
    }

    fn software_canvas(config: &AppConfig) -> impl FnOnce() -> Result<SoftwareCanvas, RenderError> {
        let size = config.window_size;
        move || Ok(SoftwareCanvas::new(size))
    }

    fn config_with_images(dir: &TempDir) -> AppConfig {
        let dot_image = dir.path().join("dot.png");
        let ring_image = dir.path().join("ring.png");
        RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255])).save(&dot_image).unwrap();
        RgbaImage::from_pixel(40, 40, Rgba([0, 0, 255, 128])).save(&ring_image).unwrap();
        AppConfig {
            dot_image,
            ring_image,
            ..AppConfig::default()
        }
    }

    const DISPLAY: DisplayConfig = DisplayConfig { refresh_rate: 60 };

    #[test]
    fn missing_sprite_fails_startup_before_any_tick() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig {
            dot_image: dir.path().join("missing.png"),
            ..config_with_images(&dir)
        };
        let state = Arc::new(SharedState::new(&config));
        let mut events = QuitOnDrain::new(1);

        let result = run_loops(&config, Arc::clone(&state), DISPLAY, software_canvas(&config), &mut events);

        assert!(matches!(result, Err(AppError::Startup(StartupError::Load(_)))));
        assert_eq!(events.drained, 0);
        assert!(state.shutdown_requested());
        // The render thread's handle on the state is gone once it is joined.
        assert_eq!(Arc::strong_count(&state), 1);
    }

    #[test]
    fn canvas_failure_fails_startup() {
        let dir = TempDir::new().unwrap();
        let config = config_with_images(&dir);
        let state = Arc::new(SharedState::new(&config));
        let mut events = QuitOnDrain::new(1);

        let result = run_loops(
            &config,
            Arc::clone(&state),
            DISPLAY,
            || Err::<SoftwareCanvas, _>(RenderError::NoAdapter),
            &mut events,
        );

        assert!(matches!(result, Err(AppError::Startup(StartupError::Render(RenderError::NoAdapter)))));
        assert_eq!(events.drained, 0);
        assert_eq!(Arc::strong_count(&state), 1);
    }

    #[test]
    fn quit_joins_the_render_thread() {
        let dir = TempDir::new().unwrap();
        let config = config_with_images(&dir);
        let state = Arc::new(SharedState::new(&config));
        let mut events = QuitOnDrain::new(3);

        let ticks = run_loops(&config, Arc::clone(&state), DISPLAY, software_canvas(&config), &mut events).unwrap();

        assert_eq!(ticks, 3);
        assert_eq!(events.drained, 3);
        assert!(state.shutdown_requested());
        assert_eq!(Arc::strong_count(&state), 1);
    }
}
