//! Decoded page images handed to the recognition pipeline

use image::RgbaImage;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::geometry::Size;
use crate::recognition::RecognitionError;

/// A decoded page photo
///
/// Pixels are shared, so cloning a source image to move it onto a worker
/// thread does not copy the bitmap.
#[derive(Clone)]
pub struct SourceImage {
    /// Decoded RGBA pixels
    pixels: Arc<RgbaImage>,
}

impl SourceImage {
    /// Wrap an already decoded RGBA bitmap
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    /// Build from a raw RGBA buffer
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RecognitionError> {
        let pixels = RgbaImage::from_raw(width, height, data).ok_or_else(|| {
            RecognitionError::invalid_image(format!(
                "buffer does not hold {}x{} RGBA pixels",
                width, height
            ))
        })?;
        Ok(Self::from_rgba(pixels))
    }

    /// Decode an encoded image (PNG, JPEG, ...)
    pub fn decode(bytes: &[u8]) -> Result<Self, RecognitionError> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| RecognitionError::invalid_image(e.to_string()))?;
        let image = Self::from_rgba(decoded.to_rgba8());
        debug!("Decoded {}x{} image", image.width(), image.height());
        Ok(image)
    }

    /// Read and decode an image file
    pub fn open(path: &Path) -> Result<Self, RecognitionError> {
        let bytes = std::fs::read(path).map_err(|e| {
            RecognitionError::invalid_image(format!("{}: {}", path.display(), e))
        })?;
        Self::decode(&bytes)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Get image dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Pixel size as used by the coordinate mapper
    pub fn size(&self) -> Size {
        Size::new(self.width() as f64, self.height() as f64)
    }

    /// Raw RGBA bytes
    pub fn data(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// True when there is nothing to recognize
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0 || self.data().is_empty()
    }
}

impl fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("bytes", &self.data().len())
            .finish()
    }
}
