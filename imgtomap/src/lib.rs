//! Convert images to WorldBox maps.
//!
//! An image is resized so that every map cell covers a 64x64 block of
//! pixels, each pixel is matched to the closest color of the selected
//! tiles, and the rows are run-length encoded into a zlib-compressed
//! `map.wbox` document.
//!
//! ```no_run
//! use imgtomap::{ConversionRequest, ImageConverter, PaletteSelection, TileCatalog};
//!
//! # fn main() -> Result<(), imgtomap::ConversionError> {
//! let catalog = TileCatalog::builtin();
//! let image = image::open("island.png")?;
//! let request = ConversionRequest {
//!     tiles: PaletteSelection::new(["deep_ocean", "sand", "grass", "mountains"]),
//!     ..ConversionRequest::new(&image, catalog)
//! };
//! let map = ImageConverter::new(catalog).convert(&request)?;
//! std::fs::write("map.wbox", &map.data)?;
//! # Ok(())
//! # }
//! ```

pub mod color;
pub mod config;
pub mod convert;
pub mod decimal;
pub mod dimensions;
pub mod document;
pub mod encode;
pub mod quantize;
pub mod tiles;

pub use color::{Palette, TileColor};
pub use config::{Config, CONFIG_FILE_NAME};
pub use convert::{ConversionError, ConversionRequest, ConversionResult, ImageConverter};
pub use dimensions::{DimensionResolver, ResolvedDimensions, CELL_PIXEL_SPAN};
pub use document::{MapDocument, MapTemplate};
pub use encode::EncodedRow;
pub use quantize::{NearestQuantizer, QuantizedCanvas, Quantizer};
pub use tiles::{PaletteSelection, TileCatalog, TileDefinition};
