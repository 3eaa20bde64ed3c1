//! Textured quad backed by a single loaded image.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use log::info;
use thiserror::Error;

use crate::engine::graphics::canvas::{Canvas, QuadRect};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to load image {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image {path} has no pixels")]
    Empty { path: PathBuf },
}

pub struct Sprite<T> {
    texture: T,
    width: u32,
    height: u32,
}

impl<T> Sprite<T> {
    pub fn load<C>(canvas: &mut C, path: impl AsRef<Path>) -> Result<Self, LoadError>
    where
        C: Canvas<Texture = T>,
    {
        let path = path.as_ref();
        let rgba = image::open(path)
            .map_err(|source| LoadError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        if rgba.width() == 0 || rgba.height() == 0 {
            return Err(LoadError::Empty {
                path: path.to_path_buf(),
            });
        }
        info!("[sprite] Loaded {}x{} from {}", rgba.width(), rgba.height(), path.display());
        Ok(Self::from_image(canvas, &rgba))
    }

    pub fn from_image<C>(canvas: &mut C, image: &RgbaImage) -> Self
    where
        C: Canvas<Texture = T>,
    {
        let (width, height) = image.dimensions();
        Self {
            texture: canvas.upload_texture(image),
            width,
            height,
        }
    }

    /// Draws the sprite with its top-left corner at `(x, y)`.
    pub fn render<C>(&self, canvas: &mut C, x: i32, y: i32)
    where
        C: Canvas<Texture = T>,
    {
        canvas.draw_textured_quad(&self.texture, QuadRect::new(x, y, self.width, self.height));
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}
