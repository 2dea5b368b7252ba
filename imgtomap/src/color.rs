//! Tile colors and nearest-color matching.
//!
//! This module contains:
//! - `TileColor`, the RGB color of a map tile
//! - `Palette`, an indexed set of tile colors that plugs into the `image`
//!   crate's dithering and color indexing through `ColorMap`

use image::imageops::ColorMap;
use image::Rgb;

/// RGB color of a map tile
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TileColor([u8; 3]);

impl TileColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        TileColor([r, g, b])
    }

    /// Red, green and blue
    pub fn channels(&self) -> [u8; 3] {
        self.0
    }

    /// Lowercase `rrggbb` hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Squared Euclidean distance to a pixel in RGB space
    pub fn distance_squared(&self, pixel: &Rgb<u8>) -> u32 {
        self.0
            .iter()
            .zip(pixel.0.iter())
            .map(|(&a, &b)| {
                let delta = i32::from(a) - i32::from(b);
                (delta * delta) as u32
            })
            .sum()
    }
}

impl From<TileColor> for Rgb<u8> {
    fn from(color: TileColor) -> Self {
        Rgb(color.0)
    }
}

/// Indexed colors of the tiles selected for one conversion.
///
/// Entry `i` is the color of the `i`th selected tile, so a color index is
/// also the tile index written to the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<TileColor>,
}

impl Palette {
    pub(crate) fn new(colors: Vec<TileColor>) -> Self {
        Palette { colors }
    }

    /// Number of colors
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Whether the palette has no colors
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Color of tile index `index`
    pub fn get(&self, index: usize) -> Option<TileColor> {
        self.colors.get(index).copied()
    }

    /// Find the index of the closest palette color.
    ///
    /// Ties go to the lowest index.
    pub fn find_best_color(&self, pixel: &Rgb<u8>) -> usize {
        let mut min_distance = u32::MAX;
        let mut min_index = 0;

        for (i, color) in self.colors.iter().enumerate() {
            let distance = color.distance_squared(pixel);
            if distance < min_distance {
                min_distance = distance;
                min_index = i;
            }
        }

        min_index
    }
}

impl ColorMap for Palette {
    type Color = Rgb<u8>;

    fn index_of(&self, color: &Rgb<u8>) -> usize {
        self.find_best_color(color)
    }

    fn lookup(&self, index: usize) -> Option<Rgb<u8>> {
        self.get(index).map(Rgb::from)
    }

    fn has_lookup(&self) -> bool {
        true
    }

    fn map_color(&self, color: &mut Rgb<u8>) {
        if let Some(best) = self.get(self.find_best_color(color)) {
            *color = best.into();
        }
    }
}
