//! Drawing surface abstraction shared by the GPU and software backends.

use image::RgbaImage;
use thiserror::Error;
use winit::dpi::PhysicalSize;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible graphics adapter found")]
    NoAdapter,

    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface has no supported formats")]
    UnsupportedSurface,

    #[error("graphics device ran out of memory")]
    OutOfMemory,
}

/// Axis-aligned quad in projection (window pixel) coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuadRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl QuadRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn max_x(&self) -> i32 {
        self.x.saturating_add(self.width as i32)
    }

    pub fn max_y(&self) -> i32 {
        self.y.saturating_add(self.height as i32)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ClearColor {
    pub const NEUTRAL_GRAY: ClearColor = ClearColor { r: 0.5, g: 0.5, b: 0.5, a: 1.0 };
}

/// Region of the surface the logical space is mapped onto, in surface pixels
/// with a top-left origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewportRect {
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Places a viewport of `size` in a surface of `surface`, anchored to the
/// bottom-left corner like `glViewport`. A viewport larger than the surface
/// shrinks to fit it.
pub fn viewport_rect(size: PhysicalSize<u32>, surface: PhysicalSize<u32>) -> ViewportRect {
    let width = size.width.min(surface.width).max(1);
    let height = size.height.min(surface.height).max(1);
    ViewportRect {
        y: surface.height.saturating_sub(height),
        width,
        height,
    }
}

/// Immediate-mode drawing target.
///
/// Draw calls are recorded in order and composited in that order when the
/// frame is presented, so a later quad always lands on top of an earlier one.
/// The projection is fixed to the logical size the canvas was created with;
/// the viewport decides where that logical space lands in the surface.
pub trait Canvas {
    type Texture;

    /// Uploads RGBA pixels as a texture sampled with nearest filtering and
    /// clamp-to-edge addressing.
    fn upload_texture(&mut self, image: &RgbaImage) -> Self::Texture;

    /// Resizes the backing surface. Does not touch the viewport.
    fn resize(&mut self, size: PhysicalSize<u32>);

    fn set_viewport(&mut self, size: PhysicalSize<u32>);

    fn clear(&mut self, color: ClearColor);

    /// Toggles source-alpha blending for subsequent draws. When off, texels
    /// replace the destination including their alpha.
    fn set_blending(&mut self, enabled: bool);

    fn draw_textured_quad(&mut self, texture: &Self::Texture, rect: QuadRect);

    /// Flushes recorded draws and shows the frame.
    fn present(&mut self) -> Result<(), RenderError>;
}
