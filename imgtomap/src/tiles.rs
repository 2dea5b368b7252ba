//! WorldBox tile catalog and palette selection.
//!
//! The catalog maps tile ids to the color each tile is drawn with. A
//! conversion picks an ordered subset of it; the position of a tile in that
//! subset is the tile index stored in the map.

use std::collections::HashSet;
use std::sync::OnceLock;

use tracing::debug;

use crate::color::{Palette, TileColor};
use crate::convert::ConversionError;

/// Largest palette whose indices fit in one byte per pixel
pub const MAX_PALETTE_SIZE: usize = 256;

/// Built-in tiles in catalog order
const WORLDBOX_TILES: &[(&str, TileColor)] = &[
    ("deep_ocean", TileColor::new(0x3e, 0x61, 0xc1)),
    ("close_ocean", TileColor::new(0x40, 0x84, 0xe2)),
    ("shallow_waters", TileColor::new(0x55, 0xae, 0xf0)),
    ("sand", TileColor::new(0xf7, 0xe8, 0x98)),
    ("soil_low", TileColor::new(0xe3, 0xa4, 0x6e)),
    ("soil_high", TileColor::new(0xb6, 0x6f, 0x3a)),
    ("hills", TileColor::new(0x5b, 0x5e, 0x5c)),
    ("mountains", TileColor::new(0x3c, 0x3c, 0x3c)),
    ("summit", TileColor::new(0xff, 0xff, 0xff)),
    ("grass", TileColor::new(0x5b, 0xa8, 0x2f)),
    ("grass_high", TileColor::new(0x44, 0x8c, 0x24)),
    ("savanna", TileColor::new(0xf4, 0x9c, 0x2a)),
    ("savanna_high", TileColor::new(0xd9, 0x80, 0x1c)),
    ("jungle", TileColor::new(0x1f, 0x7a, 0x2c)),
    ("jungle_high", TileColor::new(0x14, 0x5e, 0x1f)),
    ("enchanted", TileColor::new(0xb4, 0xe0, 0x3c)),
    ("enchanted_high", TileColor::new(0x95, 0xc3, 0x2a)),
    ("corrupted", TileColor::new(0x6e, 0x3a, 0x7a)),
    ("corrupted_high", TileColor::new(0x52, 0x29, 0x5c)),
    ("infernal", TileColor::new(0xc1, 0x2f, 0x1f)),
    ("infernal_high", TileColor::new(0x94, 0x1f, 0x14)),
    ("swamp", TileColor::new(0x5c, 0x6e, 0x3a)),
    ("swamp_high", TileColor::new(0x46, 0x55, 0x2a)),
    ("mushroom", TileColor::new(0x9e, 0x4f, 0x8c)),
    ("mushroom_high", TileColor::new(0x7d, 0x3a, 0x6e)),
    ("crystal", TileColor::new(0x7f, 0xe0, 0xe6)),
    ("crystal_high", TileColor::new(0x5a, 0xc1, 0xcc)),
    ("candy", TileColor::new(0xf5, 0x9b, 0xd6)),
    ("candy_high", TileColor::new(0xe0, 0x7a, 0xbd)),
    ("desert", TileColor::new(0xe8, 0xc8, 0x6a)),
    ("wasteland", TileColor::new(0x8a, 0x7b, 0x5e)),
    ("snow_sand", TileColor::new(0xe6, 0xee, 0xf2)),
    ("snow_low", TileColor::new(0xd2, 0xe4, 0xee)),
    ("snow_high", TileColor::new(0xbc, 0xd4, 0xe2)),
    ("snow_hills", TileColor::new(0x9f, 0xb1, 0xbd)),
    ("ice", TileColor::new(0xa8, 0xdc, 0xff)),
    ("lava", TileColor::new(0xff, 0x6a, 0x00)),
    ("road", TileColor::new(0x9b, 0x86, 0x6c)),
    ("field", TileColor::new(0xc9, 0xb2, 0x4b)),
];

/// A named tile and its color
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileDefinition {
    pub id: String,
    pub color: TileColor,
}

impl TileDefinition {
    pub fn new(id: impl Into<String>, color: TileColor) -> Self {
        TileDefinition {
            id: id.into(),
            color,
        }
    }
}

/// Read-only registry of tile ids and colors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileCatalog {
    tiles: Vec<TileDefinition>,
}

impl TileCatalog {
    /// Create a catalog from tile definitions, rejecting repeated ids.
    pub fn new(tiles: Vec<TileDefinition>) -> Result<Self, ConversionError> {
        let mut seen = HashSet::with_capacity(tiles.len());
        for tile in tiles.iter() {
            if !seen.insert(tile.id.as_str()) {
                return Err(ConversionError::DuplicateTile(tile.id.clone()));
            }
        }

        Ok(TileCatalog { tiles })
    }

    /// The WorldBox tiles, built once per process.
    pub fn builtin() -> &'static TileCatalog {
        static CATALOG: OnceLock<TileCatalog> = OnceLock::new();
        CATALOG.get_or_init(|| TileCatalog {
            tiles: WORLDBOX_TILES
                .iter()
                .map(|&(id, color)| TileDefinition::new(id, color))
                .collect(),
        })
    }

    /// Look up a tile by id
    pub fn get(&self, id: &str) -> Option<&TileDefinition> {
        self.tiles.iter().find(|tile| tile.id == id)
    }

    /// Tiles in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &TileDefinition> {
        self.tiles.iter()
    }

    /// Number of tiles
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the catalog has no tiles
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Build the indexed palette for a selection.
    ///
    /// Entry `i` of the palette is the color of `selection.tiles()[i]`.
    pub fn build_palette(&self, selection: &PaletteSelection) -> Result<Palette, ConversionError> {
        let tiles = selection.tiles();
        if tiles.is_empty() {
            return Err(ConversionError::EmptyPalette);
        }
        if tiles.len() > MAX_PALETTE_SIZE {
            return Err(ConversionError::PaletteTooLarge(tiles.len(), MAX_PALETTE_SIZE));
        }

        let mut seen = HashSet::with_capacity(tiles.len());
        let mut colors = Vec::with_capacity(tiles.len());
        for id in tiles.iter() {
            if !seen.insert(id.as_str()) {
                return Err(ConversionError::DuplicateTile(id.clone()));
            }
            let tile = self
                .get(id)
                .ok_or_else(|| ConversionError::UnknownTile(id.clone()))?;
            colors.push(tile.color);
        }

        debug!(tiles = colors.len(), "Built tile palette");
        Ok(Palette::new(colors))
    }
}

/// Ordered tile ids chosen for one conversion
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaletteSelection {
    tiles: Vec<String>,
}

impl PaletteSelection {
    pub fn new<I, S>(tiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PaletteSelection {
            tiles: tiles.into_iter().map(Into::into).collect(),
        }
    }

    /// Every tile of the catalog, in catalog order
    pub fn all(catalog: &TileCatalog) -> Self {
        PaletteSelection::new(catalog.iter().map(|tile| tile.id.clone()))
    }

    /// Selected tile ids in tile index order
    pub fn tiles(&self) -> &[String] {
        &self.tiles
    }

    /// Number of selected tiles
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether no tile is selected
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_ids_are_unique() {
        let catalog = TileCatalog::builtin();
        let rebuilt = TileCatalog::new(catalog.iter().cloned().collect());
        assert!(rebuilt.is_ok());
        assert_eq!(catalog.len(), WORLDBOX_TILES.len());
        assert_eq!(catalog.get("grass").map(|t| t.color), Some(TileColor::new(0x5b, 0xa8, 0x2f)));
    }

    #[test]
    fn test_catalog_rejects_repeated_ids() {
        let tiles = vec![
            TileDefinition::new("sand", TileColor::new(1, 2, 3)),
            TileDefinition::new("sand", TileColor::new(4, 5, 6)),
        ];
        assert!(matches!(
            TileCatalog::new(tiles),
            Err(ConversionError::DuplicateTile(id)) if id == "sand"
        ));
    }

    #[test]
    fn test_palette_follows_selection_order() {
        let catalog = TileCatalog::builtin();
        let selection = PaletteSelection::new(["summit", "deep_ocean", "grass"]);
        let palette = catalog.build_palette(&selection).unwrap();

        assert_eq!(palette.len(), 3);
        assert_eq!(palette.get(0), Some(TileColor::new(0xff, 0xff, 0xff)));
        assert_eq!(palette.get(1), Some(TileColor::new(0x3e, 0x61, 0xc1)));
        assert_eq!(palette.get(2), Some(TileColor::new(0x5b, 0xa8, 0x2f)));

        // Same input, same palette
        assert_eq!(catalog.build_palette(&selection).unwrap(), palette);
    }

    #[test]
    fn test_unknown_tile() {
        let catalog = TileCatalog::builtin();
        let selection = PaletteSelection::new(["grass", "not_a_tile"]);
        assert!(matches!(
            catalog.build_palette(&selection),
            Err(ConversionError::UnknownTile(id)) if id == "not_a_tile"
        ));
    }

    #[test]
    fn test_duplicate_tile() {
        let catalog = TileCatalog::builtin();
        let selection = PaletteSelection::new(["grass", "sand", "grass"]);
        assert!(matches!(
            catalog.build_palette(&selection),
            Err(ConversionError::DuplicateTile(id)) if id == "grass"
        ));
    }

    #[test]
    fn test_empty_selection() {
        let catalog = TileCatalog::builtin();
        assert!(matches!(
            catalog.build_palette(&PaletteSelection::default()),
            Err(ConversionError::EmptyPalette)
        ));
    }

    #[test]
    fn test_oversized_selection() {
        let tiles: Vec<TileDefinition> = (0..300)
            .map(|i| TileDefinition::new(format!("tile_{i}"), TileColor::new(i as u8, 0, 0)))
            .collect();
        let catalog = TileCatalog::new(tiles).unwrap();
        let selection = PaletteSelection::all(&catalog);
        assert!(matches!(
            catalog.build_palette(&selection),
            Err(ConversionError::PaletteTooLarge(300, MAX_PALETTE_SIZE))
        ));
    }
}
