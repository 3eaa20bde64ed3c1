//! CPU rasterizer implementing [`Canvas`] into an RGBA framebuffer.
//!
//! Used for headless runs and pixel readback. Sampling is nearest-neighbour
//! with clamped texel lookups. Blending follows
//! `src * src_alpha + dst * (1 - src_alpha)` on every channel of the stored
//! 8-bit values, the same as the GPU pipelines on their linear formats.

use image::{Rgba, RgbaImage};
use winit::dpi::PhysicalSize;

use crate::engine::graphics::canvas::{viewport_rect, Canvas, ClearColor, QuadRect, RenderError, ViewportRect};

pub struct SoftwareCanvas {
    logical_size: PhysicalSize<u32>,
    viewport: PhysicalSize<u32>,
    blending: bool,
    back: RgbaImage,
    front: RgbaImage,
    frames_presented: u64,
}

impl SoftwareCanvas {
    /// Creates a canvas whose projection and surface both match `size`.
    pub fn new(size: PhysicalSize<u32>) -> Self {
        Self {
            logical_size: size,
            viewport: size,
            blending: true,
            back: RgbaImage::new(size.width, size.height),
            front: RgbaImage::new(size.width, size.height),
            frames_presented: 0,
        }
    }

    /// Last presented frame.
    pub fn frame(&self) -> &RgbaImage {
        &self.front
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    fn surface_size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.back.width(), self.back.height())
    }

    fn region(&self) -> ViewportRect {
        viewport_rect(self.viewport, self.surface_size())
    }
}

/// Maps between logical coordinates and surface pixels inside one viewport.
struct Mapping {
    logical: PhysicalSize<u32>,
    region: ViewportRect,
}

impl Mapping {
    fn to_logical_x(&self, px: u32) -> f32 {
        (px as f32 + 0.5) * self.logical.width as f32 / self.region.width as f32
    }

    fn to_logical_y(&self, py: u32) -> f32 {
        (py as f32 - self.region.y as f32 + 0.5) * self.logical.height as f32 / self.region.height as f32
    }

    fn to_device_x(&self, lx: i32) -> i64 {
        lx as i64 * self.region.width as i64 / self.logical.width.max(1) as i64
    }

    fn to_device_y(&self, ly: i32) -> i64 {
        self.region.y as i64 + ly as i64 * self.region.height as i64 / self.logical.height.max(1) as i64
    }
}

fn channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn blend(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let alpha = src[3] as f32 / 255.0;
    let mut out = [0u8; 4];
    for (i, value) in out.iter_mut().enumerate() {
        let mixed = src[i] as f32 * alpha + dst[i] as f32 * (1.0 - alpha);
        *value = mixed.round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

fn texel_index(offset: f32, extent: u32, texels: u32) -> u32 {
    let index = (offset / extent as f32 * texels as f32).floor();
    (index.max(0.0) as u32).min(texels.saturating_sub(1))
}

impl Canvas for SoftwareCanvas {
    type Texture = RgbaImage;

    fn upload_texture(&mut self, image: &RgbaImage) -> RgbaImage {
        image.clone()
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 || size == self.surface_size() {
            return;
        }
        self.back = RgbaImage::new(size.width, size.height);
        self.front = RgbaImage::new(size.width, size.height);
    }

    fn set_viewport(&mut self, size: PhysicalSize<u32>) {
        if size.width > 0 && size.height > 0 {
            self.viewport = size;
        }
    }

    fn clear(&mut self, color: ClearColor) {
        let pixel = Rgba([channel(color.r), channel(color.g), channel(color.b), channel(color.a)]);
        for p in self.back.pixels_mut() {
            *p = pixel;
        }
    }

    fn set_blending(&mut self, enabled: bool) {
        self.blending = enabled;
    }

    fn draw_textured_quad(&mut self, texture: &RgbaImage, rect: QuadRect) {
        if rect.width == 0 || rect.height == 0 || texture.width() == 0 || texture.height() == 0 {
            return;
        }
        let region = self.region();
        let map = Mapping {
            logical: self.logical_size,
            region,
        };
        let (top, bottom) = (region.y as i64, (region.y + region.height) as i64);
        let x0 = (map.to_device_x(rect.x) - 1).clamp(0, region.width as i64) as u32;
        let x1 = (map.to_device_x(rect.max_x()) + 1).clamp(0, region.width as i64) as u32;
        let y0 = (map.to_device_y(rect.y) - 1).clamp(top, bottom) as u32;
        let y1 = (map.to_device_y(rect.max_y()) + 1).clamp(top, bottom) as u32;

        for py in y0..y1 {
            let ly = map.to_logical_y(py);
            if ly < rect.y as f32 || ly >= rect.max_y() as f32 {
                continue;
            }
            let ty = texel_index(ly - rect.y as f32, rect.height, texture.height());
            for px in x0..x1 {
                let lx = map.to_logical_x(px);
                if lx < rect.x as f32 || lx >= rect.max_x() as f32 {
                    continue;
                }
                let tx = texel_index(lx - rect.x as f32, rect.width, texture.width());
                let src = *texture.get_pixel(tx, ty);
                let out = if self.blending {
                    blend(src, *self.back.get_pixel(px, py))
                } else {
                    src
                };
                self.back.put_pixel(px, py, out);
            }
        }
    }

    fn present(&mut self) -> Result<(), RenderError> {
        self.front.clone_from(&self.back);
        self.frames_presented += 1;
        Ok(())
    }
}
