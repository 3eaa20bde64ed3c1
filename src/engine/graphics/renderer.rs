use std::borrow::Cow;
use std::sync::Arc;

use glam::Mat4;
use image::RgbaImage;
use log::{debug, info, warn};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::engine::graphics::canvas::{viewport_rect, Canvas, ClearColor, QuadRect, RenderError};
use crate::engine::graphics::texture::Texture;
use crate::engine::graphics::vertex::{quad_vertices, Vertex, QUAD_VERTEX_COUNT};

const INITIAL_QUAD_CAPACITY: u64 = 16;

struct DrawCommand {
    bind_group: Arc<wgpu::BindGroup>,
    blended: bool,
    first_vertex: u32,
}

/// [`Canvas`] backed by a wgpu surface on a winit window.
///
/// Draw calls are batched into one vertex buffer per frame and replayed in a
/// single render pass, switching between the opaque and blended pipelines as
/// the blending flag changes.
pub struct WgpuCanvas {
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    surface: wgpu::Surface<'static>,
    opaque_pipeline: wgpu::RenderPipeline,
    blended_pipeline: wgpu::RenderPipeline,
    projection_bind_group: wgpu::BindGroup,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    vertex_buffer: wgpu::Buffer,
    vertex_capacity: u64,
    vertices: Vec<Vertex>,
    commands: Vec<DrawCommand>,
    clear_color: wgpu::Color,
    viewport: PhysicalSize<u32>,
    blending: bool,
}

impl WgpuCanvas {
    /// Creates the GPU context for `window`. The projection is fixed to
    /// `logical_size` with the origin at the top-left corner.
    pub fn new(window: Arc<Window>, logical_size: PhysicalSize<u32>) -> Result<Self, RenderError> {
        pollster::block_on(Self::init(window, logical_size))
    }

    async fn init(window: Arc<Window>, logical_size: PhysicalSize<u32>) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        info!("Using adapter: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format =
            select_surface_format(&surface_caps.formats).ok_or(RenderError::UnsupportedSurface)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            // Falls back to Fifo when the platform lacks adaptive vsync.
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sprite Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("../shaders/sprite.wgsl"))),
        });

        let projection_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Projection Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(64),
                },
                count: None,
            }],
        });

        let projection = orthographic_projection(logical_size);
        let projection_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Projection Buffer"),
            contents: bytemuck::cast_slice(&[projection]),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let projection_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Projection Bind Group"),
            layout: &projection_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: projection_buffer.as_entire_binding(),
            }],
        });

        let texture_bind_group_layout = Texture::bind_group_layout(&device);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sprite Pipeline Layout"),
            bind_group_layouts: &[&projection_bind_group_layout, &texture_bind_group_layout],
            push_constant_ranges: &[],
        });

        let opaque_pipeline = create_sprite_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            config.format,
            wgpu::BlendState::REPLACE,
            "Opaque Sprite Pipeline",
        );
        let blended_pipeline = create_sprite_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            config.format,
            wgpu::BlendState::ALPHA_BLENDING,
            "Blended Sprite Pipeline",
        );

        let vertex_capacity = INITIAL_QUAD_CAPACITY * QUAD_VERTEX_COUNT as u64;
        let vertex_buffer = create_vertex_buffer(&device, vertex_capacity);

        info!(
            "GPU context ready: {}x{} surface, {:?}, projection {}x{}",
            config.width, config.height, config.format, logical_size.width, logical_size.height
        );

        Ok(Self {
            device,
            queue,
            config,
            surface,
            opaque_pipeline,
            blended_pipeline,
            projection_bind_group,
            texture_bind_group_layout,
            vertex_buffer,
            vertex_capacity,
            vertices: Vec::new(),
            commands: Vec::new(),
            clear_color: wgpu::Color::BLACK,
            viewport: logical_size,
            blending: true,
        })
    }

    fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }

    fn upload_vertices(&mut self) {
        let needed = self.vertices.len() as u64;
        if needed > self.vertex_capacity {
            self.vertex_capacity = needed.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(&self.device, self.vertex_capacity);
            debug!("Grew sprite vertex buffer to {} vertices", self.vertex_capacity);
        }
        if !self.vertices.is_empty() {
            self.queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&self.vertices));
        }
    }

    fn discard_frame(&mut self) {
        self.vertices.clear();
        self.commands.clear();
    }
}

impl Canvas for WgpuCanvas {
    type Texture = Texture;

    fn upload_texture(&mut self, image: &RgbaImage) -> Texture {
        Texture::from_image(&self.device, &self.queue, &self.texture_bind_group_layout, image)
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width > 0 && size.height > 0 {
            self.config.width = size.width;
            self.config.height = size.height;
            self.reconfigure();
        }
    }

    fn set_viewport(&mut self, size: PhysicalSize<u32>) {
        self.viewport = size;
    }

    fn clear(&mut self, color: ClearColor) {
        self.clear_color = wgpu::Color {
            r: color.r as f64,
            g: color.g as f64,
            b: color.b as f64,
            a: color.a as f64,
        };
    }

    fn set_blending(&mut self, enabled: bool) {
        self.blending = enabled;
    }

    fn draw_textured_quad(&mut self, texture: &Texture, rect: QuadRect) {
        let first_vertex = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&quad_vertices(rect));
        self.commands.push(DrawCommand {
            bind_group: Arc::clone(&texture.bind_group),
            blended: self.blending,
            first_vertex,
        });
    }

    fn present(&mut self) -> Result<(), RenderError> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("Surface lost or outdated, reconfiguring");
                self.reconfigure();
                self.discard_frame();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("Timed out acquiring surface texture, skipping frame");
                self.discard_frame();
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.discard_frame();
                return Err(RenderError::OutOfMemory);
            }
        };

        self.upload_vertices();
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Sprite Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Sprite Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let surface = PhysicalSize::new(self.config.width, self.config.height);
            let rect = viewport_rect(self.viewport, surface);
            render_pass.set_viewport(
                0.0,
                rect.y as f32,
                rect.width as f32,
                rect.height as f32,
                0.0,
                1.0,
            );
            render_pass.set_bind_group(0, &self.projection_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));

            let mut bound_blend = None;
            for command in &self.commands {
                if bound_blend != Some(command.blended) {
                    let pipeline = if command.blended {
                        &self.blended_pipeline
                    } else {
                        &self.opaque_pipeline
                    };
                    render_pass.set_pipeline(pipeline);
                    bound_blend = Some(command.blended);
                }
                render_pass.set_bind_group(1, &command.bind_group, &[]);
                render_pass.draw(command.first_vertex..command.first_vertex + QUAD_VERTEX_COUNT, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        self.discard_frame();
        Ok(())
    }
}

/// Prefers a linear (non-sRGB) surface so the clear colour and blending work
/// on the stored 8-bit values.
fn select_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| !f.is_srgb())
        .or_else(|| formats.first().copied())
}

fn orthographic_projection(size: PhysicalSize<u32>) -> [[f32; 4]; 4] {
    Mat4::orthographic_rh(0.0, size.width as f32, size.height as f32, 0.0, -1.0, 1.0).to_cols_array_2d()
}

fn create_vertex_buffer(device: &wgpu::Device, vertex_capacity: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Sprite Vertex Buffer"),
        size: vertex_capacity * std::mem::size_of::<Vertex>() as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_sprite_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    blend: wgpu::BlendState,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: "vs_main",
            buffers: &[Vertex::desc()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn projection_maps_window_corners_to_clip_space() {
        let proj = Mat4::from_cols_array_2d(&orthographic_projection(PhysicalSize::new(400, 400)));
        let top_left = proj * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let bottom_right = proj * Vec4::new(400.0, 400.0, 0.0, 1.0);
        assert!((top_left.x + 1.0).abs() < 1e-6 && (top_left.y - 1.0).abs() < 1e-6);
        assert!((bottom_right.x - 1.0).abs() < 1e-6 && (bottom_right.y + 1.0).abs() < 1e-6);
    }

    #[test]
    fn surface_format_prefers_linear() {
        use wgpu::TextureFormat::*;
        assert_eq!(select_surface_format(&[Bgra8UnormSrgb, Bgra8Unorm]), Some(Bgra8Unorm));
        assert_eq!(select_surface_format(&[Rgba8Unorm, Rgba8UnormSrgb]), Some(Rgba8Unorm));
    }

    #[test]
    fn surface_format_falls_back_to_first() {
        use wgpu::TextureFormat::*;
        assert_eq!(select_surface_format(&[Bgra8UnormSrgb, Rgba8UnormSrgb]), Some(Bgra8UnormSrgb));
        assert_eq!(select_surface_format(&[]), None);
    }
}
