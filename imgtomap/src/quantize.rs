//! Resizing and palette quantization.
//!
//! The pixel work itself is done by the `image` crate: nearest-neighbor
//! resampling, Floyd-Steinberg error diffusion and color indexing. This
//! module fixes how those primitives are driven and what comes out of them.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, RgbImage};
use tracing::debug;

use crate::color::Palette;
use crate::convert::ConversionError;
use crate::dimensions::ResolvedDimensions;

/// Palette index of every pixel of the resized image, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizedCanvas {
    indices: GrayImage,
}

impl QuantizedCanvas {
    /// Wrap a buffer of palette indices.
    pub fn from_indices(
        width: u32,
        height: u32,
        indices: Vec<u8>,
    ) -> Result<Self, ConversionError> {
        let indices = GrayImage::from_raw(width, height, indices).ok_or_else(|| {
            ConversionError::ImageProcessing(format!(
                "index buffer does not match a {}x{} canvas",
                width, height
            ))
        })?;
        Ok(QuantizedCanvas { indices })
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.indices.width()
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.indices.height()
    }

    /// Palette index at `(x, y)`, `None` outside the canvas
    pub fn index(&self, x: u32, y: u32) -> Option<u8> {
        (x < self.width() && y < self.height()).then(|| self.indices.get_pixel(x, y).0[0])
    }

    /// Pixel rows from top to bottom
    pub fn rows(&self) -> impl DoubleEndedIterator<Item = &[u8]> + ExactSizeIterator {
        // A zero-width canvas has no pixels to chunk
        let width = self.width().max(1) as usize;
        self.indices.as_raw().chunks_exact(width)
    }

    /// Draw the canvas with the palette colors.
    pub fn render(&self, palette: &Palette) -> RgbImage {
        let mut preview = RgbImage::new(self.width(), self.height());
        for (pixel, index) in preview.pixels_mut().zip(self.indices.as_raw().iter()) {
            if let Some(color) = palette.get(usize::from(*index)) {
                *pixel = color.into();
            }
        }
        preview
    }
}

/// Maps a source image onto a palette at a given canvas size
pub trait Quantizer {
    /// Resize `image` to the canvas of `dimensions` and replace every pixel
    /// with the index of its closest `palette` color, diffusing the error to
    /// neighbouring pixels when `dither` is set.
    fn quantize(
        &self,
        image: &DynamicImage,
        dimensions: &ResolvedDimensions,
        palette: &Palette,
        dither: bool,
    ) -> Result<QuantizedCanvas, ConversionError>;
}

/// Quantizer backed by the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestQuantizer;

impl Quantizer for NearestQuantizer {
    fn quantize(
        &self,
        image: &DynamicImage,
        dimensions: &ResolvedDimensions,
        palette: &Palette,
        dither: bool,
    ) -> Result<QuantizedCanvas, ConversionError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ConversionError::ImageProcessing(
                "source image has no pixels".to_string(),
            ));
        }
        if palette.is_empty() {
            return Err(ConversionError::EmptyPalette);
        }

        let mut canvas = image
            .resize_exact(
                dimensions.canvas_width,
                dimensions.canvas_height,
                FilterType::Nearest,
            )
            .to_rgb8();

        if dither {
            imageops::dither(&mut canvas, palette);
        }
        let indices = imageops::index_colors(&canvas, palette);

        debug!(
            width = indices.width(),
            height = indices.height(),
            colors = palette.len(),
            dither,
            "Quantized image"
        );
        Ok(QuantizedCanvas { indices })
    }
}
