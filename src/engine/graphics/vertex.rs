use wgpu;

use crate::engine::graphics::canvas::QuadRect;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: &[wgpu::VertexAttribute] = &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            wgpu::VertexAttribute {
                offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
        ];

        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: ATTRIBUTES,
        }
    }
}

pub const QUAD_VERTEX_COUNT: u32 = 6;

/// Two triangles covering `rect`, texture mapped corner to corner.
pub fn quad_vertices(rect: QuadRect) -> [Vertex; QUAD_VERTEX_COUNT as usize] {
    let (x0, y0) = (rect.x as f32, rect.y as f32);
    let (x1, y1) = (rect.max_x() as f32, rect.max_y() as f32);
    let top_left = Vertex { position: [x0, y0], tex_coords: [0.0, 0.0] };
    let top_right = Vertex { position: [x1, y0], tex_coords: [1.0, 0.0] };
    let bottom_right = Vertex { position: [x1, y1], tex_coords: [1.0, 1.0] };
    let bottom_left = Vertex { position: [x0, y1], tex_coords: [0.0, 1.0] };
    [top_left, top_right, bottom_right, bottom_right, bottom_left, top_left]
}
