pub mod canvas;
pub mod renderer;
pub mod software;
pub mod sprite;
pub mod texture;
pub mod vertex;

pub use canvas::{Canvas, ClearColor, QuadRect, RenderError};
pub use renderer::WgpuCanvas;
pub use software::SoftwareCanvas;
pub use sprite::{LoadError, Sprite};
pub use texture::Texture;
pub use vertex::Vertex;
