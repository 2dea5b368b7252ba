//! Image to map conversion
//!
//! This module ties the pipeline together: size resolution, palette
//! construction, quantization, row encoding and document serialization.

use std::io;

use image::{DynamicImage, RgbImage};
use thiserror::Error;
use tracing::{debug, info};

use crate::dimensions::DimensionResolver;
use crate::document::{MapDocument, MapTemplate};
use crate::encode::encode_rows;
use crate::quantize::{NearestQuantizer, Quantizer};
use crate::tiles::{PaletteSelection, TileCatalog};

/// Errors that can occur during image conversion
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Invalid map dimensions: {0}")]
    InvalidDimension(String),

    #[error("Unknown tile '{0}'")]
    UnknownTile(String),

    #[error("Tile '{0}' is selected more than once")]
    DuplicateTile(String),

    #[error("No tiles selected")]
    EmptyPalette,

    #[error("{0} tiles selected but a palette holds at most {1}")]
    PaletteTooLarge(usize, usize),

    #[error("Failed to read image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Invalid map document: {0}")]
    InvalidDocument(String),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Everything needed to convert one image
#[derive(Debug, Clone)]
pub struct ConversionRequest<'a> {
    /// Source image
    pub image: &'a DynamicImage,
    /// Whether to apply dithering
    pub dither: bool,
    /// Map width in cells, 0 for automatic
    pub width: i64,
    /// Map height in cells, 0 for automatic
    pub height: i64,
    /// Tiles the map may use, in tile index order
    pub tiles: PaletteSelection,
}

impl<'a> ConversionRequest<'a> {
    /// Automatic size, no dithering, every tile of `catalog`
    pub fn new(image: &'a DynamicImage, catalog: &TileCatalog) -> Self {
        ConversionRequest {
            image,
            dither: false,
            width: 0,
            height: 0,
            tiles: PaletteSelection::all(catalog),
        }
    }
}

/// A converted map
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Compressed map document, the content of a `map.wbox` file
    pub data: Vec<u8>,
    /// Map width in cells
    pub width: u32,
    /// Map height in cells
    pub height: u32,
    /// Quantized image as it appears before the rows are flipped
    pub preview: RgbImage,
}

/// Main struct for the image conversion process
pub struct ImageConverter<'c, Q = NearestQuantizer> {
    catalog: &'c TileCatalog,
    resolver: DimensionResolver,
    quantizer: Q,
    template: MapTemplate,
}

impl<'c> ImageConverter<'c> {
    /// Create a converter for the tiles of `catalog`
    pub fn new(catalog: &'c TileCatalog) -> Self {
        ImageConverter {
            catalog,
            resolver: DimensionResolver::default(),
            quantizer: NearestQuantizer,
            template: MapTemplate::default(),
        }
    }
}

impl<'c, Q: Quantizer> ImageConverter<'c, Q> {
    /// Replace the quantizer
    pub fn with_quantizer<R: Quantizer>(self, quantizer: R) -> ImageConverter<'c, R> {
        ImageConverter {
            catalog: self.catalog,
            resolver: self.resolver,
            quantizer,
            template: self.template,
        }
    }

    /// Replace the fixed document fields
    pub fn with_template(mut self, template: MapTemplate) -> Self {
        self.template = template;
        self
    }

    /// Use a different number of pixels per cell edge
    pub fn with_resolver(mut self, resolver: DimensionResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Main execution function to run the entire conversion process
    pub fn convert(
        &self,
        request: &ConversionRequest<'_>,
    ) -> Result<ConversionResult, ConversionError> {
        let image = request.image;

        // Resolve the map size before touching any pixels
        let dimensions = self.resolver.resolve(
            image.width(),
            image.height(),
            request.width,
            request.height,
        )?;

        // Build the palette from the selected tiles
        let palette = self.catalog.build_palette(&request.tiles)?;

        // Resize and quantize
        let canvas = self
            .quantizer
            .quantize(image, &dimensions, &palette, request.dither)?;
        if canvas.width() != dimensions.canvas_width
            || canvas.height() != dimensions.canvas_height
        {
            return Err(ConversionError::ImageProcessing(format!(
                "quantizer returned a {}x{} canvas, expected {}x{}",
                canvas.width(),
                canvas.height(),
                dimensions.canvas_width,
                dimensions.canvas_height
            )));
        }
        if let Some(&index) = canvas
            .rows()
            .flatten()
            .find(|&&index| usize::from(index) >= palette.len())
        {
            return Err(ConversionError::ImageProcessing(format!(
                "quantizer produced tile index {} for a palette of {}",
                index,
                palette.len()
            )));
        }

        // Keep the unflipped image for the preview
        let preview = canvas.render(&palette);

        // Flip and run-length encode the rows
        let rows = encode_rows(&canvas);
        debug!(
            rows = rows.len(),
            runs = rows.iter().map(|row| row.values.len()).sum::<usize>(),
            "Encoded rows"
        );

        // Assemble and compress the map document
        let document = MapDocument::new(
            &self.template,
            dimensions.cell_width,
            dimensions.cell_height,
            request.tiles.tiles().to_vec(),
            rows,
        );
        let data = document.compress()?;

        info!(
            width = dimensions.cell_width,
            height = dimensions.cell_height,
            bytes = data.len(),
            "Converted image to map"
        );

        Ok(ConversionResult {
            data,
            width: dimensions.cell_width,
            height: dimensions.cell_height,
            preview,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Palette;
    use crate::dimensions::ResolvedDimensions;
    use crate::quantize::QuantizedCanvas;
    use image::Rgb;

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    fn grass_color() -> [u8; 3] {
        TileCatalog::builtin()
            .get("grass")
            .map(|tile| tile.color.channels())
            .unwrap()
    }

    /// Always answers with a fixed canvas
    struct FixedQuantizer(QuantizedCanvas);

    impl Quantizer for FixedQuantizer {
        fn quantize(
            &self,
            _image: &DynamicImage,
            _dimensions: &ResolvedDimensions,
            _palette: &Palette,
            _dither: bool,
        ) -> Result<QuantizedCanvas, ConversionError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_solid_grass_image() {
        let catalog = TileCatalog::builtin();
        let image = solid(128, 128, grass_color());
        let request = ConversionRequest {
            tiles: PaletteSelection::new(["grass"]),
            ..ConversionRequest::new(&image, catalog)
        };

        let result = ImageConverter::new(catalog).convert(&request).unwrap();
        assert_eq!((result.width, result.height), (2, 2));
        assert_eq!(result.preview.dimensions(), (128, 128));
        assert!(result.preview.pixels().all(|p| p.0 == grass_color()));

        let document = MapDocument::decode(&result.data).unwrap();
        assert_eq!((document.width, document.height), (2, 2));
        assert_eq!(document.tile_map, vec!["grass".to_string()]);
        assert_eq!(document.rows.len(), 128);
        for row in document.rows.iter() {
            assert_eq!(row.values, vec![0]);
            assert_eq!(row.run_lengths, vec![128]);
        }
    }

    #[test]
    fn test_runs_cover_canvas_width() {
        let catalog = TileCatalog::builtin();
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(200, 130, |x, y| {
            Rgb([(x % 256) as u8, (y * 2 % 256) as u8, ((x + y) % 256) as u8])
        }));
        let request = ConversionRequest {
            dither: true,
            ..ConversionRequest::new(&image, catalog)
        };

        let result = ImageConverter::new(catalog).convert(&request).unwrap();
        let document = MapDocument::decode(&result.data).unwrap();
        let canvas_width = u64::from(result.width) * 64;

        assert_eq!(document.tile_map.len(), catalog.len());
        for row in document.rows.iter() {
            assert_eq!(row.pixel_count(), canvas_width);
            assert_eq!(row.values.len(), row.run_lengths.len());
            assert!(row.values.iter().all(|&v| usize::from(v) < catalog.len()));
        }
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let catalog = TileCatalog::builtin();
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(150, 90, |x, y| {
            Rgb([(x * 3 % 256) as u8, (y * 5 % 256) as u8, 90])
        }));
        let request = ConversionRequest {
            dither: true,
            width: 3,
            ..ConversionRequest::new(&image, catalog)
        };
        let converter = ImageConverter::new(catalog);

        let first = converter.convert(&request).unwrap();
        let second = converter.convert(&request).unwrap();
        assert_eq!(first.data, second.data);
        assert_eq!(first.preview, second.preview);
    }

    #[test]
    fn test_preview_is_not_flipped() {
        let catalog = TileCatalog::builtin();
        let canvas = QuantizedCanvas::from_indices(
            64,
            64,
            (0..64 * 64).map(|i| u8::from(i < 64 * 32)).collect(),
        )
        .unwrap();
        let converter = ImageConverter::new(catalog).with_quantizer(FixedQuantizer(canvas));
        let image = solid(64, 64, [0, 0, 0]);
        let request = ConversionRequest {
            tiles: PaletteSelection::new(["sand", "deep_ocean"]),
            ..ConversionRequest::new(&image, catalog)
        };

        let result = converter.convert(&request).unwrap();
        let deep_ocean = catalog.get("deep_ocean").unwrap().color.channels();
        let sand = catalog.get("sand").unwrap().color.channels();
        assert_eq!(result.preview.get_pixel(0, 0).0, deep_ocean);
        assert_eq!(result.preview.get_pixel(0, 63).0, sand);

        // The document starts from the bottom row
        let document = MapDocument::decode(&result.data).unwrap();
        assert_eq!(document.rows[0].values, vec![0]);
        assert_eq!(document.rows[63].values, vec![1]);
    }

    #[test]
    fn test_rows_decode_to_canvas() {
        let catalog = TileCatalog::builtin();
        let canvas = QuantizedCanvas::from_indices(
            128,
            64,
            (0..128 * 64u32)
                .map(|i| ((i % 128 / 10 + i / 128) % 3) as u8)
                .collect(),
        )
        .unwrap();
        let converter = ImageConverter::new(catalog).with_quantizer(FixedQuantizer(canvas.clone()));
        let image = solid(128, 64, [0, 0, 0]);
        let request = ConversionRequest {
            tiles: PaletteSelection::new(["sand", "grass", "hills"]),
            ..ConversionRequest::new(&image, catalog)
        };

        let result = converter.convert(&request).unwrap();
        let document = MapDocument::decode(&result.data).unwrap();
        assert_eq!(document.rows.len(), 64);
        for (i, row) in document.rows.iter().enumerate() {
            let y = 63 - i as u32;
            let expected: Vec<u8> = (0..128).filter_map(|x| canvas.index(x, y)).collect();
            assert_eq!(row.decode(), expected);
        }
    }

    #[test]
    fn test_quantizer_output_is_checked() {
        let catalog = TileCatalog::builtin();
        let image = solid(64, 64, [0, 0, 0]);
        let request = ConversionRequest {
            tiles: PaletteSelection::new(["sand"]),
            ..ConversionRequest::new(&image, catalog)
        };

        let wrong_size = QuantizedCanvas::from_indices(2, 2, vec![0; 4]).unwrap();
        let converter = ImageConverter::new(catalog).with_quantizer(FixedQuantizer(wrong_size));
        assert!(matches!(
            converter.convert(&request),
            Err(ConversionError::ImageProcessing(_))
        ));

        let bad_index = QuantizedCanvas::from_indices(64, 64, vec![3; 64 * 64]).unwrap();
        let converter = ImageConverter::new(catalog).with_quantizer(FixedQuantizer(bad_index));
        assert!(matches!(
            converter.convert(&request),
            Err(ConversionError::ImageProcessing(_))
        ));
    }

    #[test]
    fn test_custom_cell_span() {
        let catalog = TileCatalog::builtin();
        let image = solid(16, 24, grass_color());
        let request = ConversionRequest {
            tiles: PaletteSelection::new(["grass", "sand"]),
            ..ConversionRequest::new(&image, catalog)
        };

        let result = ImageConverter::new(catalog)
            .with_resolver(DimensionResolver::new(8))
            .convert(&request)
            .unwrap();
        assert_eq!((result.width, result.height), (2, 3));
        assert_eq!(result.preview.dimensions(), (16, 24));

        let document = MapDocument::decode(&result.data).unwrap();
        assert_eq!(document.rows.len(), 24);
        assert!(document.rows.iter().all(|row| row.run_lengths == vec![16]));
    }

    #[test]
    fn test_unknown_tile() {
        let catalog = TileCatalog::builtin();
        let image = solid(64, 64, [0, 0, 0]);
        let request = ConversionRequest {
            tiles: PaletteSelection::new(["grass", "obsidian_floor"]),
            ..ConversionRequest::new(&image, catalog)
        };
        assert!(matches!(
            ImageConverter::new(catalog).convert(&request),
            Err(ConversionError::UnknownTile(id)) if id == "obsidian_floor"
        ));
    }

    #[test]
    fn test_negative_dimensions() {
        let catalog = TileCatalog::builtin();
        let image = solid(64, 64, [0, 0, 0]);
        for (width, height) in [(-1, 0), (0, -1)] {
            let request = ConversionRequest {
                width,
                height,
                ..ConversionRequest::new(&image, catalog)
            };
            assert!(matches!(
                ImageConverter::new(catalog).convert(&request),
                Err(ConversionError::InvalidDimension(_))
            ));
        }
    }

    #[test]
    fn test_custom_template() {
        let catalog = TileCatalog::builtin();
        let image = solid(64, 64, grass_color());
        let template = MapTemplate::from_json(br#"{"saveVersion":3,"custom":true}"#).unwrap();
        let request = ConversionRequest {
            tiles: PaletteSelection::new(["grass"]),
            ..ConversionRequest::new(&image, catalog)
        };

        let result = ImageConverter::new(catalog)
            .with_template(template)
            .convert(&request)
            .unwrap();
        let document = MapDocument::decode(&result.data).unwrap();
        let keys: Vec<&str> = document.template().fields().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["saveVersion", "custom", "width", "height", "tileMap", "tileArray", "tileAmounts"]
        );
    }
}
