//! Frame loop, rate-limited to the display refresh rate.

use std::path::Path;
use std::sync::Arc;

use log::{debug, info};
use winit::dpi::PhysicalSize;

use crate::engine::graphics::canvas::{Canvas, ClearColor, RenderError};
use crate::engine::graphics::sprite::{LoadError, Sprite};
use crate::engine::time::{Clock, RateCounter};
use crate::game::config::{AppConfig, DisplayConfig, MIN_FRAME_SLEEP_MS};
use crate::game::state::{Positions, SharedState};

/// The two sprites every frame draws.
pub struct Scene<T> {
    dot: Sprite<T>,
    ring: Sprite<T>,
}

impl<T> Scene<T> {
    pub fn load<C>(canvas: &mut C, dot_image: &Path, ring_image: &Path) -> Result<Self, LoadError>
    where
        C: Canvas<Texture = T>,
    {
        Ok(Self {
            dot: Sprite::load(canvas, dot_image)?,
            ring: Sprite::load(canvas, ring_image)?,
        })
    }

    pub fn from_sprites(dot: Sprite<T>, ring: Sprite<T>) -> Self {
        Self { dot, ring }
    }

    /// Opaque shapes first, then the translucent ring blended over them.
    pub fn draw<C>(&self, canvas: &mut C, positions: &Positions)
    where
        C: Canvas<Texture = T>,
    {
        canvas.set_blending(false);
        self.dot.render(canvas, positions.dot.x, positions.dot.y);
        self.ring.render(canvas, positions.ring2.x, positions.ring2.y);
        canvas.set_blending(true);
        self.ring.render(canvas, positions.ring1.x, positions.ring1.y);
    }
}

/// Reports a window size only when it differs from the last one seen.
#[derive(Debug, Default)]
pub struct ViewportTracker {
    last: PhysicalSize<u32>,
}

impl ViewportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, size: PhysicalSize<u32>) -> Option<PhysicalSize<u32>> {
        if size == self.last {
            return None;
        }
        self.last = size;
        Some(size)
    }
}

/// Time to sleep after a frame, or `None` when too little budget remains
/// to risk oversleeping.
pub fn frame_sleep_ms(budget_ms: u64, elapsed_ms: u64) -> Option<u64> {
    let remaining = budget_ms as i64 - elapsed_ms as i64;
    (remaining >= MIN_FRAME_SLEEP_MS).then_some(remaining as u64)
}

pub struct RenderLoop<C: Canvas, K: Clock> {
    canvas: C,
    clock: K,
    scene: Scene<C::Texture>,
    state: Arc<SharedState>,
    display: DisplayConfig,
    rescale_on_resize: bool,
    clear_color: ClearColor,
    tracker: ViewportTracker,
    rate: RateCounter,
    frames: u64,
}

impl<C: Canvas, K: Clock> RenderLoop<C, K> {
    pub fn new(
        canvas: C,
        clock: K,
        scene: Scene<C::Texture>,
        state: Arc<SharedState>,
        display: DisplayConfig,
        config: &AppConfig,
    ) -> Self {
        Self {
            canvas,
            clock,
            scene,
            state,
            display,
            rescale_on_resize: config.rescale_on_resize,
            clear_color: config.clear_color,
            tracker: ViewportTracker::new(),
            rate: RateCounter::new(),
            frames: 0,
        }
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Draws and presents one frame, then sleeps off the rest of its budget.
    pub fn frame(&mut self) -> Result<(), RenderError> {
        let frame_start = self.clock.now_ms();

        if let Some(size) = self.tracker.observe(self.state.window_size()) {
            self.canvas.resize(size);
            if self.rescale_on_resize {
                debug!("Viewport set to {}x{}", size.width, size.height);
                self.canvas.set_viewport(size);
            }
        }

        self.canvas.clear(self.clear_color);
        self.scene.draw(&mut self.canvas, &self.state.snapshot());
        self.canvas.present()?;
        self.frames += 1;

        let now = self.clock.now_ms();
        if let Some(fps) = self.rate.record(now) {
            debug!("Frames per second: {fps}");
        }
        if let Some(ms) = frame_sleep_ms(self.display.min_ms_per_frame(), now.saturating_sub(frame_start)) {
            self.clock.sleep_ms(ms);
        }
        Ok(())
    }

    /// Renders until shutdown is requested. A render failure raises shutdown
    /// so the update loop stops too.
    pub fn run(&mut self) -> Result<u64, RenderError> {
        info!("Render loop started at {}Hz", self.display.refresh_rate);
        while !self.state.shutdown_requested() {
            if let Err(e) = self.frame() {
                self.state.request_shutdown();
                return Err(e);
            }
        }
        info!("Render loop stopped after {} frames", self.frames);
        Ok(self.frames)
    }
}
