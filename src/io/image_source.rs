//! Target image loading and PNG export.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;

use crate::compute::Frame;

/// Produces target images in the renderer's pixel format (RGBA8, row-major).
pub trait ImageSource {
    fn load(&self, path: &Path) -> Result<Frame, ImageError>;
}

/// Decodes image files from disk with the `image` crate.
#[derive(Debug, Clone, Default)]
pub struct FileImageSource {
    /// Downscale so the longer side is at most this many pixels.
    pub max_dimension: Option<u32>,
}

impl FileImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: Some(max_dimension),
        }
    }
}

impl ImageSource for FileImageSource {
    fn load(&self, path: &Path) -> Result<Frame, ImageError> {
        let bytes = std::fs::read(path).map_err(|source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut image = image::load_from_memory(&bytes)?;

        if let Some(max) = self.max_dimension
            && max > 0
            && image.width().max(image.height()) > max
        {
            image = image.resize(max, max, FilterType::Triangle);
        }

        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(ImageError::Empty(path.to_path_buf()));
        }
        log::info!("Loaded {} ({}x{})", path.display(), width, height);

        Frame::from_raw(width, height, rgba.into_raw()).ok_or(ImageError::Empty(path.to_path_buf()))
    }
}

/// Write a frame as a PNG file.
pub fn save_png(frame: &Frame, path: impl AsRef<Path>) -> Result<(), ImageError> {
    let path = path.as_ref();
    let (width, height) = frame.dimensions();
    let image = image::RgbaImage::from_raw(width, height, frame.pixels().to_vec())
        .ok_or_else(|| ImageError::Empty(path.to_path_buf()))?;
    image.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

/// Errors raised while reading or writing images.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Image codec error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Image {0} has no pixels")]
    Empty(PathBuf),
}
