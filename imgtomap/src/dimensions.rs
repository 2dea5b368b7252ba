//! Map size resolution.
//!
//! A map is measured in cells; each cell covers `cell_pixel_span` pixels
//! per edge of the resized image. Missing dimensions are derived from the
//! source image's aspect ratio.

use tracing::debug;

use crate::convert::ConversionError;
use crate::decimal::{Decimal, Rounding};

/// Pixels per cell edge in a WorldBox map
pub const CELL_PIXEL_SPAN: u32 = 64;

/// Final map size in cells, and the pixel canvas it is rendered on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDimensions {
    pub cell_width: u32,
    pub cell_height: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

/// Computes map and canvas sizes for a source image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionResolver {
    cell_pixel_span: u32,
}

impl Default for DimensionResolver {
    fn default() -> Self {
        DimensionResolver {
            cell_pixel_span: CELL_PIXEL_SPAN,
        }
    }
}

impl DimensionResolver {
    /// Resolver with `cell_pixel_span` pixels per cell edge
    pub fn new(cell_pixel_span: u32) -> Self {
        DimensionResolver { cell_pixel_span }
    }

    /// Resolve the map size for a `source_width`x`source_height` image.
    ///
    /// A requested size of 0 means automatic. When only one side is given,
    /// the other follows the aspect ratio of the source measured in whole
    /// cells. When both are given they are used as-is.
    ///
    /// The canvas height is `ceil((height / width) * width * span)` in
    /// 28-digit decimal arithmetic, not `height * span`. The rounded
    /// quotient makes it one pixel taller for some sizes (3x5 cells gives
    /// 321 rows) and maps written by other converters depend on that.
    pub fn resolve(
        &self,
        source_width: u32,
        source_height: u32,
        requested_width: i64,
        requested_height: i64,
    ) -> Result<ResolvedDimensions, ConversionError> {
        if requested_width < 0 || requested_height < 0 {
            return Err(ConversionError::InvalidDimension(format!(
                "width and height cannot be lower than 0, got {}x{}",
                requested_width, requested_height
            )));
        }
        if self.cell_pixel_span == 0 {
            return Err(ConversionError::InvalidDimension(
                "cell pixel span must be positive".to_string(),
            ));
        }

        let base_width = div_round_half_even(source_width, self.cell_pixel_span).max(1);
        let base_height = div_round_half_even(source_height, self.cell_pixel_span).max(1);
        let ratio = Decimal::from(base_height)
            .checked_div(Decimal::from(base_width))
            .ok_or_else(overflow)?;

        let (width, height) = match (requested_width as u64, requested_height as u64) {
            (0, 0) => (u128::from(base_width), u128::from(base_height)),
            (0, height) => {
                let width = Decimal::from(height)
                    .checked_div(ratio)
                    .and_then(|w| w.to_integral(Rounding::HalfEven))
                    .ok_or_else(overflow)?;
                (width, u128::from(height))
            }
            (width, 0) => {
                let height = Decimal::from(width)
                    .checked_mul(ratio)
                    .and_then(|h| h.to_integral(Rounding::HalfEven))
                    .ok_or_else(overflow)?;
                (u128::from(width), height)
            }
            (width, height) => (u128::from(width), u128::from(height)),
        };

        if width == 0 || height == 0 {
            return Err(ConversionError::InvalidDimension(format!(
                "map size resolved to {}x{} cells",
                width, height
            )));
        }

        let cell_width = to_u32(width)?;
        let cell_height = to_u32(height)?;
        let canvas_width = cell_width
            .checked_mul(self.cell_pixel_span)
            .ok_or_else(overflow)?;
        let canvas_height = self.canvas_height(cell_width, cell_height)?;

        let resolved = ResolvedDimensions {
            cell_width,
            cell_height,
            canvas_width,
            canvas_height,
        };
        debug!(
            source_width,
            source_height,
            requested_width,
            requested_height,
            ?resolved,
            "Resolved map dimensions"
        );
        Ok(resolved)
    }

    fn canvas_height(&self, cell_width: u32, cell_height: u32) -> Result<u32, ConversionError> {
        let width = Decimal::from(cell_width);
        let pixels = Decimal::from(cell_height)
            .checked_div(width)
            .and_then(|q| q.checked_mul(width))
            .and_then(|q| q.checked_mul(Decimal::from(self.cell_pixel_span)))
            .and_then(|q| q.to_integral(Rounding::Ceiling))
            .ok_or_else(overflow)?;
        to_u32(pixels)
    }
}

/// `numerator / denominator` rounded half to even
fn div_round_half_even(numerator: u32, denominator: u32) -> u32 {
    let quotient = numerator / denominator;
    let twice_remainder = u64::from(numerator % denominator) * 2;
    let denominator = u64::from(denominator);

    if twice_remainder > denominator || (twice_remainder == denominator && quotient % 2 == 1) {
        quotient + 1
    } else {
        quotient
    }
}

fn to_u32(value: u128) -> Result<u32, ConversionError> {
    u32::try_from(value).map_err(|_| overflow())
}

fn overflow() -> ConversionError {
    ConversionError::InvalidDimension("map size is too large".to_string())
}
